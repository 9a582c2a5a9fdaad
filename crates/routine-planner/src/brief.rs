//! Offline planner backend driven by each spec's `workflow_brief`.
//!
//! Every brief entry is an arrow-separated tool chain such as
//! `ga4.pull → compute.check → gAds.updateBid(-20%)`. Steps are wired by
//! output name using the tool hints, and references are written against the
//! global ids the flattener will assign, since channels are emitted in spec
//! order and numbered by one shared counter.

use std::collections::HashMap;

use async_trait::async_trait;
use routine_core::{CanonicalSpec, Result};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::backend::PlannerBackend;

/// Deterministic planner that needs no model.
#[derive(Debug, Clone, Default)]
pub struct BriefPlanner;

/// One `tool(args)` segment of a brief.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BriefSegment {
    pub tool: String,
    pub args: Option<String>,
}

impl BriefPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Build planner output for the specs.
    pub fn plan(&self, specs: &[CanonicalSpec]) -> Value {
        let mut next_id: u32 = 1;
        let agent_specs: Vec<Value> = specs
            .iter()
            .map(|spec| channel_agents(spec, &mut next_id))
            .collect();
        json!({ "agent_specs": agent_specs })
    }
}

#[async_trait]
impl PlannerBackend for BriefPlanner {
    async fn propose(&self, specs: &[CanonicalSpec]) -> Result<Value> {
        Ok(self.plan(specs))
    }

    fn name(&self) -> &str {
        "brief"
    }
}

/// Split a brief line into tool segments.
pub fn parse_brief(line: &str) -> Vec<BriefSegment> {
    line.replace("->", "→")
        .split('→')
        .filter_map(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            match raw.split_once('(') {
                Some((tool, rest)) => {
                    let args = rest.trim_end().trim_end_matches(')').trim();
                    Some(BriefSegment {
                        tool: tool.trim().to_string(),
                        args: (!args.is_empty()).then(|| args.to_string()),
                    })
                }
                None => Some(BriefSegment {
                    tool: raw.to_string(),
                    args: None,
                }),
            }
        })
        .filter(|segment| !segment.tool.is_empty())
        .collect()
}

fn channel_agents(spec: &CanonicalSpec, next_id: &mut u32) -> Value {
    let flag = spec
        .critic_hints
        .as_ref()
        .and_then(|hints| hints.only_when_flag.clone());
    let required: &[String] = spec
        .critic_hints
        .as_ref()
        .map(|hints| hints.require_inputs.as_slice())
        .unwrap_or_default();

    let mut producers: HashMap<String, u32> = HashMap::new();
    let mut steps = Vec::new();
    let mut tools_allowed: Vec<String> = Vec::new();

    for line in &spec.workflow_brief {
        for segment in parse_brief(line) {
            let id = *next_id;
            *next_id += 1;

            let hint = spec.tools.get(&segment.tool);
            let mut inputs = Map::new();
            if let Some(hint) = hint {
                for name in hint.inputs.keys() {
                    if let Some(producer) = producers.get(name) {
                        inputs.insert(name.clone(), json!(format!("${}.{}", producer, name)));
                    } else if required.contains(name) {
                        // Supplied as a run seed.
                        inputs.insert(name.clone(), json!(format!("${}", name)));
                    }
                }
            }
            if let Some(args) = &segment.args {
                inputs.insert("args".to_string(), json!(args));
            }

            let outputs: Vec<String> = hint
                .map(|h| h.outputs.keys().cloned().collect())
                .unwrap_or_default();

            let mut step = json!({
                "tool": segment.tool,
                "inputs": inputs,
                "outputs": outputs,
            });
            if let (Some(flag), Some(producer)) = (&flag, producers.get("flag")) {
                step["condition"] = json!(format!("${}.flag == {}", producer, quote(flag)));
            }
            if let Some(title) = hint.and_then(|h| h.title.clone()) {
                step["description"] = json!(title);
            }
            steps.push(step);

            for name in &outputs {
                producers.insert(name.clone(), id);
            }
            if !tools_allowed.contains(&segment.tool) {
                tools_allowed.push(segment.tool.clone());
            }
        }
    }

    debug!(channel = %spec.id, steps = steps.len(), "Planned channel from brief");

    json!({
        "channel_id": spec.id,
        "agents": [
            {
                "role": "planner",
                "name": format!("{}-planner", spec.id),
                "instructions": spec.tagline,
                "kpis": spec.kpis,
                "routine_steps": steps,
            },
            {
                "role": "executor",
                "name": format!("{}-executor", spec.id),
                "tools_allowed": tools_allowed,
            },
            {
                "role": "critic",
                "name": format!("{}-critic", spec.id),
                "critic_rules": critic_rules(spec),
            },
            {
                "role": "observer",
                "name": format!("{}-observer", spec.id),
                "observer": observer(spec),
            }
        ]
    })
}

fn critic_rules(spec: &CanonicalSpec) -> Vec<Value> {
    let mut rules = Vec::new();
    let Some(hints) = &spec.critic_hints else {
        return rules;
    };
    if let Some(cap) = hints.max_bid_change_pct {
        let change = "(result.newMicros - result.oldMicros) / result.oldMicros * 100";
        rules.push(json!({
            "name": "Bid change within cap",
            "when": format!("{change} > {cap} || {change} < -{cap}"),
            "severity": "error",
            "action": format!("Bid moved more than {}%; halting", cap),
        }));
    }
    if let Some(min) = hints.min_seed {
        rules.push(json!({
            "name": "Seed audience above minimum",
            "when": format!("result.seedIds.length < {}", min),
            "severity": "error",
            "action": format!("Seed audience smaller than {}; not building lookalike", min),
        }));
    }
    if hints.require_brand_safety == Some(true) {
        rules.push(json!({
            "name": "Brand safety confirmed",
            "when": "result.brandSafe == false",
            "severity": "error",
            "action": "Creative failed brand-safety review",
        }));
    }
    rules
}

/// Single-quoted expression literal.
fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn observer(spec: &CanonicalSpec) -> Value {
    let (events, sinks) = match &spec.observer_hints {
        Some(hints) => (hints.events.clone(), hints.sinks.as_slice()),
        None => (Vec::new(), &[][..]),
    };

    let mut notes = spec.tagline.clone();
    for sink in sinks {
        if let Ok(line) = serde_json::to_string(sink) {
            notes.push_str("\nsink: ");
            notes.push_str(&line);
        }
    }

    json!({
        "counters": ["steps_started"],
        "gauges": spec.kpis,
        "events": events,
        "notes": notes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use routine_core::{CriticHints, PlannerOutput, ToolHint};

    fn hint(inputs: &[&str], outputs: &[&str]) -> ToolHint {
        ToolHint {
            title: None,
            inputs: inputs.iter().map(|k| (k.to_string(), "number".to_string())).collect(),
            outputs: outputs.iter().map(|k| (k.to_string(), "number".to_string())).collect(),
        }
    }

    #[test]
    fn test_parse_brief() {
        let segments = parse_brief("ga4.pull → compute.check -> gAds.updateBid(-20%)");
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[2].tool, "gAds.updateBid");
        assert_eq!(segments[2].args.as_deref(), Some("-20%"));
        assert!(parse_brief("  →  ").is_empty());
    }

    #[test]
    fn test_brief_wires_outputs_with_global_ids() {
        let search = CanonicalSpec::builder("search")
            .brief("ga4.pull → compute.check")
            .tool("ga4.pull", hint(&[], &["roas"]))
            .tool("compute.check", hint(&["roas"], &["flag"]))
            .build()
            .unwrap();
        let meta = CanonicalSpec::builder("meta")
            .brief("meta.pullAdsetMetrics → compute.checkFatigue")
            .tool("meta.pullAdsetMetrics", hint(&[], &["frequency"]))
            .tool("compute.checkFatigue", hint(&["frequency"], &["flag"]))
            .build()
            .unwrap();

        let output = PlannerOutput::from_value(&BriefPlanner::new().plan(&[search, meta]));
        let (_, steps) = output.agent_specs[1].planner().unwrap();
        // Second channel starts at global id 3.
        assert_eq!(steps[1].inputs["frequency"], json!("$3.frequency"));
    }

    #[test]
    fn test_flag_condition_and_bid_cap_rule() {
        let spec = CanonicalSpec::builder("search")
            .brief("compute.check → gAds.updateBid(-20%)")
            .tool("compute.check", hint(&[], &["flag"]))
            .critic_hints(CriticHints {
                max_bid_change_pct: Some(25.0),
                only_when_flag: Some("low".to_string()),
                ..CriticHints::default()
            })
            .build()
            .unwrap();
        let output = PlannerOutput::from_value(&BriefPlanner::new().plan(&[spec]));
        let (_, steps) = output.agent_specs[0].planner().unwrap();
        assert!(steps[0].condition.is_none());
        assert_eq!(steps[1].condition.as_deref(), Some("$1.flag == 'low'"));
        assert_eq!(steps[1].inputs["args"], json!("-20%"));

        let (_, rules) = output.agent_specs[0].critic().unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].severity.as_deref(), Some("error"));
    }

    #[test]
    fn test_flag_with_quote_is_escaped() {
        let spec = CanonicalSpec::builder("search")
            .brief("compute.check → gAds.updateBid")
            .tool("compute.check", hint(&[], &["flag"]))
            .critic_hints(CriticHints {
                only_when_flag: Some("it's low".to_string()),
                ..CriticHints::default()
            })
            .build()
            .unwrap();
        let output = PlannerOutput::from_value(&BriefPlanner::new().plan(&[spec]));
        let (_, steps) = output.agent_specs[0].planner().unwrap();
        assert_eq!(steps[1].condition.as_deref(), Some(r"$1.flag == 'it\'s low'"));
    }

    #[test]
    fn test_required_inputs_and_min_seed() {
        let spec = CanonicalSpec::builder("amc")
            .brief("compute.seedFormatter → amc.createLookAlike")
            .tool("compute.seedFormatter", hint(&["campaignId", "lookback"], &["seedIds"]))
            .tool("amc.createLookAlike", hint(&["seedIds"], &["audienceId"]))
            .critic_hints(CriticHints {
                require_inputs: vec!["campaignId".to_string()],
                min_seed: Some(100.0),
                ..CriticHints::default()
            })
            .build()
            .unwrap();
        let output = PlannerOutput::from_value(&BriefPlanner::new().plan(&[spec]));
        let (_, steps) = output.agent_specs[0].planner().unwrap();
        assert_eq!(steps[0].inputs["campaignId"], json!("$campaignId"));
        assert!(!steps[0].inputs.contains_key("lookback"));
        assert_eq!(steps[1].inputs["seedIds"], json!("$1.seedIds"));

        let (_, rules) = output.agent_specs[0].critic().unwrap();
        assert_eq!(rules[0].when.as_deref(), Some("result.seedIds.length < 100"));
    }

    #[test]
    fn test_spec_without_brief_has_no_steps() {
        let spec = CanonicalSpec::builder("quiet").build().unwrap();
        let output = PlannerOutput::from_value(&BriefPlanner::new().plan(&[spec]));
        let (_, steps) = output.agent_specs[0].planner().unwrap();
        assert!(steps.is_empty());
    }
}
