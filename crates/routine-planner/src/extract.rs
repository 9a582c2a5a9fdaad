//! Guardrail and telemetry extraction from planner output.

use routine_core::artifact::sha256_hex;
use routine_core::{
    AgentSpecItem, CriticRule, CriticRuleDraft, ObserverSpec, PlannerOutput, Severity,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Critic rules and the single observer spec of one compile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Guardrails {
    /// Normalized rules, in channel order then rule order.
    pub rules: Vec<CriticRule>,

    /// The observer spec of the first observer item found, if any.
    pub observer: Option<ObserverSpec>,

    /// Channel the observer spec came from.
    pub observer_channel: Option<String>,
}

/// Extract critic rules and the observer spec.
pub fn extract_guardrails(output: &PlannerOutput) -> Guardrails {
    let rules = extract_critic_rules(output);
    let (observer_channel, observer) = match first_observer(output) {
        Some((channel, spec)) => (Some(channel.to_string()), spec.cloned()),
        None => (None, None),
    };

    info!(
        "Extracted {} critic rules; observer {}",
        rules.len(),
        if observer.is_some() { "present" } else { "absent" }
    );

    Guardrails {
        rules,
        observer,
        observer_channel,
    }
}

/// Normalize every channel's critic rules.
pub fn extract_critic_rules(output: &PlannerOutput) -> Vec<CriticRule> {
    let mut rules = Vec::new();
    for spec in &output.agent_specs {
        let Some((profile, drafts)) = spec.critic() else {
            continue;
        };
        for (index, draft) in drafts.iter().enumerate() {
            rules.push(normalize_rule(&spec.channel_id, &profile.name, index, draft));
        }
    }
    rules
}

/// First-match reducer over observer items: the first agent item with the
/// observer role, across channels in order, supplies the only observer spec.
/// Later observer items are ignored, never merged.
pub fn first_observer(output: &PlannerOutput) -> Option<(&str, Option<&ObserverSpec>)> {
    let mut found: Option<(&str, Option<&ObserverSpec>)> = None;
    for spec in &output.agent_specs {
        for item in &spec.agents {
            if let AgentSpecItem::Observer { observer, profile } = item {
                if found.is_none() {
                    found = Some((spec.channel_id.as_str(), observer.as_ref()));
                } else {
                    debug!(
                        channel = %spec.channel_id,
                        agent = %profile.name,
                        "Ignoring additional observer item"
                    );
                }
            }
        }
    }
    found
}

/// Stable id for a rule the planner did not name: derived from channel id,
/// agent name and rule name, never random.
pub fn synthesize_rule_id(channel_id: &str, agent_name: &str, rule_name: &str) -> String {
    let digest = sha256_hex(&format!("{}\u{1f}{}\u{1f}{}", channel_id, agent_name, rule_name));
    format!("rule-{}", &digest[..12])
}

fn normalize_rule(
    channel_id: &str,
    agent_name: &str,
    index: usize,
    draft: &CriticRuleDraft,
) -> CriticRule {
    let name = draft
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("rule-{}", index + 1));

    let id = draft
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| synthesize_rule_id(channel_id, agent_name, &name));

    CriticRule {
        id,
        name,
        when: draft.when.clone(),
        severity: draft
            .severity
            .as_deref()
            .map(Severity::parse_lenient)
            .unwrap_or_default(),
        action: draft.action.clone(),
        description: draft.description.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bundle() -> PlannerOutput {
        PlannerOutput::from_value(&json!({
            "agent_specs": [
                { "channel_id": "search", "agents": [
                    { "role": "critic", "name": "bid-critic", "critic_rules": [
                        {
                            "id": "cap",
                            "name": "Bid cap",
                            "when": "result.percent > 20",
                            "severity": "error"
                        },
                        { "name": "Low flag", "when": "$2.flag == 'low'" }
                    ]},
                    { "role": "observer", "name": "obs-1", "observer": { "counters": ["steps"] } }
                ]},
                { "channel_id": "meta", "agents": [
                    {
                        "role": "critic",
                        "name": "meta-critic",
                        "rules": [{ "when": "true", "severity": "WARN" }]
                    },
                    { "role": "observer", "name": "obs-2", "observer": { "counters": ["other"] } }
                ]}
            ]
        }))
    }

    #[test]
    fn test_rules_from_both_field_names() {
        let rules = extract_critic_rules(&bundle());
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].id, "cap");
        assert_eq!(rules[0].severity, Severity::Error);
        assert_eq!(rules[1].severity, Severity::Warn);
        assert_eq!(rules[2].name, "rule-1");
    }

    #[test]
    fn test_synthesized_ids_are_stable() {
        let first = extract_critic_rules(&bundle());
        let second = extract_critic_rules(&bundle());
        assert_eq!(first[1].id, second[1].id);
        assert_eq!(first[1].id, synthesize_rule_id("search", "bid-critic", "Low flag"));
        assert!(first[1].id.starts_with("rule-"));
        assert_ne!(
            synthesize_rule_id("search", "bid-critic", "a"),
            synthesize_rule_id("meta", "bid-critic", "a")
        );
    }

    #[test]
    fn test_first_observer_wins() {
        let guardrails = extract_guardrails(&bundle());
        assert_eq!(guardrails.observer.unwrap().counters, vec!["steps"]);
        assert_eq!(guardrails.observer_channel.as_deref(), Some("search"));
    }

    #[test]
    fn test_first_observer_without_spec_still_wins() {
        let out = PlannerOutput::from_value(&json!({
            "agent_specs": [
                { "channel_id": "a", "agents": [{ "role": "observer", "name": "bare" }] },
                { "channel_id": "b", "agents": [
                    { "role": "observer", "name": "full", "observer": { "events": ["x"] } }
                ]}
            ]
        }));
        let guardrails = extract_guardrails(&out);
        assert!(guardrails.observer.is_none());
        assert_eq!(guardrails.observer_channel.as_deref(), Some("a"));
    }

    #[test]
    fn test_no_critics_no_observer() {
        let guardrails = extract_guardrails(&PlannerOutput::default());
        assert!(guardrails.rules.is_empty());
        assert!(guardrails.observer.is_none());
    }
}
