//! Planner output through flattening, extraction and code generation.

use routine_core::{PlannerOutput, RoutineError};
use routine_planner::{extract_guardrails, flatten_to_routine_plan};
use routine_scaffold::{Compiled, ScaffoldInput, TemplateBuilder};
use serde_json::{json, Value};

fn planner_output() -> Value {
    json!({
        "agent_specs": [
            {
                "channel_id": "search_bid_guardian",
                "agents": [
                    {
                        "role": "planner",
                        "name": "search-planner",
                        "routine_steps": [
                            {"tool": "ga4.pull", "inputs": {"campaignId": 42}, "outputs": ["roas"]},
                            {
                                "tool": "compute.check",
                                "inputs": {"roas": "$1.roas"},
                                "outputs": ["flag"]
                            },
                            {
                                "tool": "gAds.updateBid",
                                "inputs": {"pct": -20},
                                "condition": "$2.flag == 'low'"
                            }
                        ]
                    },
                    {
                        "role": "critic",
                        "name": "search-critic",
                        "critic_rules": [
                            {
                                "name": "Bid cap",
                                "when": "result.delta > 25",
                                "severity": "ERROR",
                                "action": "halt"
                            },
                            {"name": "Inert"}
                        ]
                    },
                    {
                        "role": "observer",
                        "name": "search-observer",
                        "observer": {
                            "counters": ["steps_started"],
                            "gauges": ["roas"],
                            "events": [],
                            "notes": "search notes"
                        }
                    }
                ]
            },
            {
                "channel_id": "dv360_cpm_watch",
                "agents": [
                    {"role": "executor", "name": "dv-exec"}
                ]
            },
            {
                "channel_id": "amc_lookalike",
                "agents": [
                    {
                        "role": "planner",
                        "name": "amc-planner",
                        "routine_steps": [
                            {"tool": "amc.fetchPurchasers"},
                            {"tool": "ga4.pull"},
                            {"tool": "amc.customScore", "inputs": {"seed": "$4.result"}}
                        ]
                    },
                    {
                        "role": "observer",
                        "name": "amc-observer",
                        "observer": {"counters": ["ignored"]}
                    }
                ]
            }
        ]
    })
}

fn compile(raw: &Value) -> Result<Compiled, RoutineError> {
    let output = PlannerOutput::from_value(raw);
    let plan = flatten_to_routine_plan(&output);
    let guardrails = extract_guardrails(&output);
    let input = ScaffoldInput::new(plan)
        .rules(guardrails.rules)
        .observer(guardrails.observer)
        .title("Marketing routines")
        .agents(raw.clone());
    TemplateBuilder::default().compile(&input)
}

#[test]
fn compiles_multi_channel_output() {
    let compiled = compile(&planner_output()).unwrap();
    let summary = &compiled.summary;

    assert_eq!(summary.step_count, 6);
    assert_eq!(
        summary.bound_tools,
        vec!["ga4.pull", "compute.check", "gAds.updateBid", "amc.fetchPurchasers"]
    );
    assert_eq!(summary.unbound_tools, vec!["amc.customScore"]);
    assert_eq!(summary.rule_count, 2);
    assert!(summary.observer_present);

    let steps: Value = serde_json::from_str(compiled.artifacts.get("steps.json").unwrap()).unwrap();
    let ids: Vec<u64> = steps
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(steps[3]["agent"], json!("amc_lookalike:amc-planner"));
    // References are not rewritten.
    assert_eq!(steps[5]["inputs"]["seed"], json!("$4.result"));
}

#[test]
fn unknown_tool_compiles_to_placeholder() {
    let compiled = compile(&planner_output()).unwrap();
    let workflow = compiled.artifacts.get("workflow.rs").unwrap();
    assert!(workflow.contains("// Step 6: amc.customScore"));
    assert!(workflow.contains("// No binding for tool \"amc.customScore\"."));
    assert!(workflow.contains("let result = rt.not_implemented(&step);"));
    assert!(compiled.artifacts.get("README.md").unwrap().contains("## Unbound tools"));
}

#[test]
fn conditions_and_rules_are_rendered() {
    let compiled = compile(&planner_output()).unwrap();
    let workflow = compiled.artifacts.get("workflow.rs").unwrap();
    assert!(workflow.contains("if rt.condition(&step, \"$2.flag == 'low'\")"));
    assert!(workflow.contains(
        "use crate::tools::{ga4_pull, ComputeCheck, GAdsUpdateBid, AmcFetchPurchasers};\n"
    ));
    assert!(workflow.contains("GAdsUpdateBid.execute(ToolContext::new(inputs))"));
    assert!(!workflow.contains("crate::tools::GAdsUpdateBid"));

    let critics = compiled.artifacts.get("critics.rs").unwrap();
    assert!(critics.contains("CriticRule::new(\"rule-"));
    assert!(critics.contains(".severity(Severity::Error)"));

    // First observer wins.
    let observer = compiled.artifacts.get("observer.rs").unwrap();
    assert!(observer.contains(".counter(\"steps_started\")"));
    assert!(!observer.contains("ignored"));
    assert!(observer.contains("// search notes"));
}

#[test]
fn identical_inputs_render_identical_artifacts() {
    let first = compile(&planner_output()).unwrap();
    let second = compile(&planner_output()).unwrap();
    assert_eq!(first.artifacts, second.artifacts);
    assert_eq!(first.summary.digest, second.summary.digest);
}

#[test]
fn no_planner_steps_is_nothing_to_compile() {
    let raw = json!({
        "agent_specs": [
            {"channel_id": "quiet", "agents": [
                {"role": "planner", "name": "p", "routine_steps": "not a list"}
            ]},
            {"channel_id": "empty", "agents": []}
        ]
    });
    let err = compile(&raw).unwrap_err();
    assert!(matches!(err, RoutineError::NothingToCompile { .. }));
    assert!(matches!(compile(&json!(null)).unwrap_err(), RoutineError::NothingToCompile { .. }));
}
