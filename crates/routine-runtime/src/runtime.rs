//! Step primitives shared by generated workflows and the [`Interpreter`].
//!
//! Every step runs the same sequence:
//!
//! 1. `before_step` (step_start hooks)
//! 2. resolve inputs, evaluate the condition
//! 3. invoke the tool, or take `null` when the condition is false
//! 4. `record_outputs`
//! 5. `run_critics` (may abort)
//! 6. `after_step` (step_end hooks)
//!
//! [`Interpreter`]: crate::interpreter::Interpreter

use std::future::Future;
use std::sync::Arc;

use routine_core::{Reference, StepId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::context::RunContext;
use crate::critics::{CriticFinding, CriticSet};
use crate::error::{RunError, ToolError};
use crate::expr;
use crate::hooks::{isolate, Hooks, StepInfo};
use crate::tool;

/// What a completed run leaves behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Final run context as a JSON object.
    pub context: Value,
    /// Warn findings, in firing order.
    pub findings: Vec<CriticFinding>,
    pub steps_run: usize,
    /// Steps whose condition was false.
    pub steps_skipped: Vec<StepId>,
}

/// State of one run.
pub struct Runtime {
    context: RunContext,
    critics: CriticSet,
    hooks: Vec<Arc<dyn Hooks>>,
    findings: Vec<CriticFinding>,
    steps_run: usize,
    steps_skipped: Vec<StepId>,
}

impl Runtime {
    pub fn new(seeds: Map<String, Value>, critics: CriticSet) -> Self {
        Self {
            context: RunContext::with_seeds(seeds),
            critics,
            hooks: Vec::new(),
            findings: Vec::new(),
            steps_run: 0,
            steps_skipped: Vec::new(),
        }
    }

    /// Attach a hook implementation. Hooks run in attachment order.
    pub fn with_hooks(mut self, hooks: Arc<dyn Hooks>) -> Self {
        self.hooks.push(hooks);
        self
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    pub fn findings(&self) -> &[CriticFinding] {
        &self.findings
    }

    /// Parse a JSON literal embedded in generated code.
    pub fn literal(json: &str) -> Value {
        serde_json::from_str(json).unwrap_or_else(|err| {
            warn!(error = %err, "Embedded literal is not JSON; using null");
            Value::Null
        })
    }

    /// Call `run_start` on every hook.
    pub async fn start(&mut self) {
        info!(seeds = self.context.len(), rules = self.critics.len(), "Routine run starting");
        for hook in &self.hooks {
            isolate("run_start", hook.run_start(&self.context)).await;
        }
    }

    pub async fn before_step(&mut self, step: &StepInfo) {
        debug!(step = %step.id, tool = %step.tool, agent = %step.agent, "Step starting");
        for hook in &self.hooks {
            isolate("step_start", hook.step_start(step, &self.context)).await;
        }
    }

    /// Resolve `$` references in a step's inputs.
    pub fn resolve(&self, inputs: &Value) -> Value {
        self.context.resolve(inputs)
    }

    /// Evaluate a step condition. Errors count as false. A false condition
    /// marks the step as skipped.
    pub fn condition(&mut self, step: &StepInfo, source: &str) -> bool {
        let passed = expr::evaluate_condition(source, &self.context);
        if !passed {
            debug!(step = %step.id, condition = %source, "Condition false; tool not invoked");
            self.steps_skipped.push(step.id);
        }
        passed
    }

    /// Await a bound tool call, turning its error into a run abort.
    pub async fn invoke<F>(&mut self, step: &StepInfo, call: F) -> Result<Value, RunError>
    where
        F: Future<Output = Result<Value, ToolError>>,
    {
        self.steps_run += 1;
        call.await.map_err(|source| {
            warn!(step = %step.id, tool = %step.tool, error = %source, "Tool failed; aborting run");
            RunError::ToolFailed {
                step: step.id,
                tool: step.tool.clone(),
                source,
            }
        })
    }

    /// Result for a step whose tool has no binding.
    pub fn not_implemented(&mut self, step: &StepInfo) -> Value {
        warn!(step = %step.id, tool = %step.tool, "Tool not implemented");
        self.steps_run += 1;
        tool::not_implemented(&step.tool)
    }

    /// Publish a step's result into the run context.
    ///
    /// Each declared name takes the result field of that name, else the
    /// element at its position when the result is an array, else the whole
    /// result. With no declared names the whole result lands under
    /// `$<id>.result`.
    pub fn record_outputs(&mut self, step: StepId, outputs: &[&str], result: &Value) {
        if outputs.is_empty() {
            self.context.record(&Reference::default_output(step), result.clone());
            return;
        }
        for (index, name) in outputs.iter().enumerate() {
            let value = match result {
                Value::Object(map) if map.contains_key(*name) => map[*name].clone(),
                Value::Array(items) => items.get(index).cloned().unwrap_or(Value::Null),
                other => other.clone(),
            };
            self.context.record(&Reference::new(step, *name), value);
        }
    }

    /// Run every critic rule against the step's result.
    pub fn run_critics(&mut self, step: &StepInfo, result: &Value) -> Result<(), RunError> {
        let findings = self.critics.check(step.id, &step.tool, &self.context, result)?;
        self.findings.extend(findings);
        Ok(())
    }

    pub async fn after_step(&mut self, step: &StepInfo, result: &Value) {
        for hook in &self.hooks {
            isolate("step_end", hook.step_end(step, result, &self.context)).await;
        }
    }

    /// Call `run_end` on every hook and hand back the outcome.
    pub async fn finish(self) -> RunOutcome {
        for hook in &self.hooks {
            isolate("run_end", hook.run_end(&self.context)).await;
        }
        info!(
            steps_run = self.steps_run,
            skipped = self.steps_skipped.len(),
            findings = self.findings.len(),
            "Routine run finished"
        );
        RunOutcome {
            context: self.context.to_json(),
            findings: self.findings,
            steps_run: self.steps_run,
            steps_skipped: self.steps_skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn runtime() -> Runtime {
        Runtime::new(Map::new(), CriticSet::default())
    }

    #[test]
    fn test_record_named_field() {
        let mut rt = runtime();
        rt.record_outputs(StepId(1), &["roas", "spend"], &json!({"roas": 4.2, "spend": 10}));
        assert_eq!(rt.context().get("$1.roas"), Some(&json!(4.2)));
        assert_eq!(rt.context().get("$1.spend"), Some(&json!(10)));
    }

    #[test]
    fn test_record_positional_fallback() {
        let mut rt = runtime();
        rt.record_outputs(StepId(2), &["a", "b", "c"], &json!([1, 2]));
        assert_eq!(rt.context().get("$2.a"), Some(&json!(1)));
        assert_eq!(rt.context().get("$2.b"), Some(&json!(2)));
        assert_eq!(rt.context().get("$2.c"), Some(&Value::Null));
    }

    #[test]
    fn test_record_whole_result_fallback() {
        let mut rt = runtime();
        rt.record_outputs(StepId(3), &["flag"], &json!("low"));
        rt.record_outputs(StepId(4), &["flag"], &json!({"other": 1}));
        assert_eq!(rt.context().get("$3.flag"), Some(&json!("low")));
        assert_eq!(rt.context().get("$4.flag"), Some(&json!({"other": 1})));
    }

    #[test]
    fn test_record_default_key() {
        let mut rt = runtime();
        rt.record_outputs(StepId(5), &[], &json!({"rows": 3}));
        assert_eq!(rt.context().get("$5.result"), Some(&json!({"rows": 3})));
    }

    #[test]
    fn test_literal() {
        assert_eq!(Runtime::literal(r#"{"x":"$1.roas"}"#), json!({"x": "$1.roas"}));
        assert_eq!(Runtime::literal("{"), Value::Null);
    }

    #[tokio::test]
    async fn test_invoke_maps_tool_error() {
        let mut rt = runtime();
        let step = StepInfo::new(1, "ga4.pull", "search:planner");
        let err = rt
            .invoke(&step, async { Err(ToolError::Upstream("quota".to_string())) })
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::ToolFailed { step, .. } if step == StepId(1)));
    }
}
