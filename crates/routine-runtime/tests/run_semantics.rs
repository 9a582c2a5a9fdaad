//! End-to-end run semantics through the plan-driven interpreter.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use routine_core::{CriticRule, RoutinePlan, RoutineStep, Severity, StepId};
use routine_runtime::{
    FnTool, HookError, Hooks, Interpreter, RunContext, RunError, StepInfo, StubObserver,
    ToolContext, ToolSet,
};
use serde_json::{json, Map, Value};

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<String>>,
}

impl Recorder {
    fn push(&self, entry: String) {
        self.calls.lock().unwrap().push(entry);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Hooks for Recorder {
    async fn run_start(&self, _context: &RunContext) -> Result<(), HookError> {
        self.push("run_start".to_string());
        Ok(())
    }

    async fn step_start(&self, step: &StepInfo, _context: &RunContext) -> Result<(), HookError> {
        self.push(format!("step_start:{}", step.id));
        Ok(())
    }

    async fn step_end(
        &self,
        step: &StepInfo,
        _result: &Value,
        _context: &RunContext,
    ) -> Result<(), HookError> {
        self.push(format!("step_end:{}", step.id));
        Err(HookError::new("sink down"))
    }

    async fn run_end(&self, _context: &RunContext) -> Result<(), HookError> {
        self.push("run_end".to_string());
        Ok(())
    }
}

fn counting_tools(calls: Arc<Mutex<Vec<String>>>) -> ToolSet {
    let pull_calls = Arc::clone(&calls);
    let bid_calls = Arc::clone(&calls);
    ToolSet::new()
        .with(
            "ga4.pull",
            FnTool::new(move |_cx: ToolContext| {
                pull_calls.lock().unwrap().push("ga4.pull".to_string());
                Ok(json!({"roas": 1.2}))
            }),
        )
        .with(
            "gAds.updateBid",
            FnTool::new(move |_cx: ToolContext| {
                bid_calls.lock().unwrap().push("gAds.updateBid".to_string());
                Ok(json!({"oldMicros": 100, "newMicros": 150}))
            }),
        )
}

fn bid_plan(condition: &str) -> RoutinePlan {
    let mut plan = RoutinePlan::new();
    plan.push(RoutineStep::new("ga4.pull").output("roas"), "search:planner");
    plan.push(
        RoutineStep::new("gAds.updateBid")
            .input("roas", "$1.roas")
            .condition(condition)
            .output("newMicros"),
        "search:planner",
    );
    plan.push(RoutineStep::new("ga4.pull"), "search:planner");
    plan
}

#[tokio::test]
async fn failed_condition_skips_tool_but_keeps_bookkeeping() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::new(Recorder::default());
    let warn_on_null = CriticRule::new("r-null", "Null result").when("result === null");

    let outcome = Interpreter::new(bid_plan("$9.undefined == 'low'"), counting_tools(calls.clone()))
        .with_rules(vec![warn_on_null])
        .with_hooks(recorder.clone())
        .run(Map::new())
        .await
        .unwrap();

    assert_eq!(*calls.lock().unwrap(), vec!["ga4.pull", "ga4.pull"]);
    assert_eq!(outcome.context["$2.newMicros"], Value::Null);
    assert_eq!(outcome.steps_skipped, vec![StepId(2)]);
    // Guardrails still ran for the skipped step.
    assert_eq!(outcome.findings.len(), 1);
    assert_eq!(outcome.findings[0].step, StepId(2));
    // Hooks still ran, and their errors did not abort.
    assert_eq!(
        recorder.calls(),
        vec![
            "run_start",
            "step_start:1",
            "step_end:1",
            "step_start:2",
            "step_end:2",
            "step_start:3",
            "step_end:3",
            "run_end"
        ]
    );
}

#[tokio::test]
async fn invalid_condition_syntax_is_false() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let outcome = Interpreter::new(bid_plan("$1.roas < < 2"), counting_tools(calls.clone()))
        .run(Map::new())
        .await
        .unwrap();
    assert_eq!(calls.lock().unwrap().len(), 2);
    assert_eq!(outcome.context["$2.newMicros"], Value::Null);
}

#[tokio::test]
async fn error_guardrail_stops_before_later_steps() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::new(Recorder::default());
    let cap = CriticRule::new("r-cap", "Bid change within cap")
        .when("(result.newMicros - result.oldMicros) / result.oldMicros * 100 > 25")
        .severity(Severity::Error);

    let err = Interpreter::new(bid_plan("$1.roas < 2"), counting_tools(calls.clone()))
        .with_rules(vec![cap])
        .with_hooks(recorder.clone())
        .run(Map::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::GuardrailViolation { ref rule_id, .. } if rule_id == "r-cap"));
    assert_eq!(err.step(), StepId(2));
    assert_eq!(*calls.lock().unwrap(), vec!["ga4.pull", "gAds.updateBid"]);
    // No step_end for the aborted step, no run_end.
    assert_eq!(recorder.calls().last().map(String::as_str), Some("step_start:2"));
}

#[tokio::test]
async fn warn_guardrail_lets_the_run_continue() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let cap = CriticRule::new("r-cap", "Bid change within cap")
        .when("(result.newMicros - result.oldMicros) / result.oldMicros * 100 > 25");

    let outcome = Interpreter::new(bid_plan("$1.roas < 2"), counting_tools(calls.clone()))
        .with_rules(vec![cap])
        .run(Map::new())
        .await
        .unwrap();

    assert_eq!(calls.lock().unwrap().len(), 3);
    assert_eq!(outcome.findings.len(), 1);
    assert_eq!(outcome.context["$3.result"], json!({"roas": 1.2}));
}

#[tokio::test]
async fn stub_observer_counts_steps() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let observer = Arc::new(
        StubObserver::builder()
            .counter("steps_started")
            .gauge("roas")
            .event("run_end")
            .build(),
    );

    Interpreter::new(bid_plan("$1.roas < 2"), counting_tools(calls))
        .with_hooks(observer.clone())
        .run(Map::new())
        .await
        .unwrap();

    let snapshot = observer.snapshot().await;
    assert_eq!(snapshot.counters["steps_started"], 3);
    assert_eq!(snapshot.gauges["roas"], 1.2);
    assert_eq!(snapshot.events.len(), 1);
}

#[tokio::test]
async fn seeds_are_visible_and_write_once() {
    let mut plan = RoutinePlan::new();
    plan.push(
        RoutineStep::new("echo").input("campaign", "$campaign").output("campaign"),
        "meta:planner",
    );
    let tools = ToolSet::new().with("echo", FnTool::new(|cx: ToolContext| Ok(cx.inputs)));

    let mut seeds = Map::new();
    seeds.insert("$campaign".to_string(), json!("c-9"));
    seeds.insert("$1.campaign".to_string(), json!("seeded"));

    let outcome = Interpreter::new(plan, tools).run(seeds).await.unwrap();
    // The seeded key wins; the step's write is ignored.
    assert_eq!(outcome.context["$1.campaign"], json!("seeded"));
}
