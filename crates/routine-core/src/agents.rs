//! Role-tagged agent items as returned by a planner backend.
//!
//! Planner output is loosely typed. [`PlannerOutput::from_value`] reads it
//! tolerantly: unknown roles, non-array step lists and malformed entries are
//! dropped rather than treated as errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::plan::RoutineStep;
use crate::types::{AgentRole, ObserverSpec};

/// Fields every agent item carries, whatever its role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AgentProfile {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools_allowed: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kpis: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guardrails: Vec<String>,
}

/// A critic rule as the planner wrote it, before normalization.
///
/// Every field is optional. Read with [`CriticRuleDraft::from_value`], which
/// treats null or wrong-typed fields as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CriticRuleDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CriticRuleDraft {
    /// Read one rule. Returns `None` only for non-objects.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object()?;
        Some(Self {
            id: str_field(value, "id"),
            name: str_field(value, "name"),
            when: str_field(value, "when"),
            severity: str_field(value, "severity"),
            action: str_field(value, "action"),
            description: str_field(value, "description"),
        })
    }
}

/// One agent of a channel. Only the planner variant carries steps, only the
/// critic carries rules, only the observer carries an observer spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum AgentSpecItem {
    Planner {
        #[serde(flatten)]
        profile: AgentProfile,
        #[serde(default)]
        routine_steps: Vec<RoutineStep>,
    },
    Executor {
        #[serde(flatten)]
        profile: AgentProfile,
    },
    Critic {
        #[serde(flatten)]
        profile: AgentProfile,
        #[serde(default, alias = "rules")]
        critic_rules: Vec<CriticRuleDraft>,
    },
    Observer {
        #[serde(flatten)]
        profile: AgentProfile,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        observer: Option<ObserverSpec>,
    },
}

impl AgentSpecItem {
    pub fn role(&self) -> AgentRole {
        match self {
            AgentSpecItem::Planner { .. } => AgentRole::Planner,
            AgentSpecItem::Executor { .. } => AgentRole::Executor,
            AgentSpecItem::Critic { .. } => AgentRole::Critic,
            AgentSpecItem::Observer { .. } => AgentRole::Observer,
        }
    }

    pub fn profile(&self) -> &AgentProfile {
        match self {
            AgentSpecItem::Planner { profile, .. }
            | AgentSpecItem::Executor { profile }
            | AgentSpecItem::Critic { profile, .. }
            | AgentSpecItem::Observer { profile, .. } => profile,
        }
    }

    pub fn name(&self) -> &str {
        &self.profile().name
    }

    /// Read one item tolerantly. Returns `None` for non-objects and unknown
    /// or missing roles.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let role = obj.get("role").and_then(Value::as_str).and_then(AgentRole::parse);
        let Some(role) = role else {
            debug!(role = ?obj.get("role"), "Ignoring agent item with unknown role");
            return None;
        };
        let profile = AgentProfile {
            name: str_field(value, "name").unwrap_or_default(),
            instructions: str_field(value, "instructions"),
            tools_allowed: string_list(value.get("tools_allowed")),
            kpis: string_list(value.get("kpis")),
            guardrails: string_list(value.get("guardrails")),
        };

        let item = match role {
            AgentRole::Planner => AgentSpecItem::Planner {
                routine_steps: lenient_list(
                    value.get("routine_steps"),
                    "routine step",
                    RoutineStep::from_value,
                ),
                profile,
            },
            AgentRole::Executor => AgentSpecItem::Executor { profile },
            AgentRole::Critic => {
                let rules = match value.get("critic_rules") {
                    Some(Value::Array(_)) => value.get("critic_rules"),
                    _ => value.get("rules"),
                };
                AgentSpecItem::Critic {
                    critic_rules: lenient_list(rules, "critic rule", CriticRuleDraft::from_value),
                    profile,
                }
            }
            AgentRole::Observer => AgentSpecItem::Observer {
                observer: value.get("observer").and_then(lenient_observer),
                profile,
            },
        };
        Some(item)
    }
}

/// All agents proposed for one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub channel_id: String,
    #[serde(default)]
    pub agents: Vec<AgentSpecItem>,
}

impl AgentSpec {
    /// The first item with the given role.
    pub fn find(&self, role: AgentRole) -> Option<&AgentSpecItem> {
        self.agents.iter().find(|item| item.role() == role)
    }

    /// The planner item and its steps, if any.
    pub fn planner(&self) -> Option<(&AgentProfile, &[RoutineStep])> {
        self.agents.iter().find_map(|item| match item {
            AgentSpecItem::Planner {
                profile,
                routine_steps,
            } => Some((profile, routine_steps.as_slice())),
            _ => None,
        })
    }

    /// The critic item and its draft rules, if any.
    pub fn critic(&self) -> Option<(&AgentProfile, &[CriticRuleDraft])> {
        self.agents.iter().find_map(|item| match item {
            AgentSpecItem::Critic {
                profile,
                critic_rules,
            } => Some((profile, critic_rules.as_slice())),
            _ => None,
        })
    }

    /// The observer item's spec, if an observer item with a spec exists.
    pub fn observer(&self) -> Option<&ObserverSpec> {
        self.agents.iter().find_map(|item| match item {
            AgentSpecItem::Observer { observer, .. } => observer.as_ref(),
            _ => None,
        })
    }
}

/// Bundle of per-channel agent specs, in channel order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlannerOutput {
    #[serde(default)]
    pub agent_specs: Vec<AgentSpec>,
}

impl PlannerOutput {
    /// Read planner output tolerantly. Anything that is not an object with
    /// an `agent_specs` array reads as an empty bundle.
    pub fn from_value(value: &Value) -> Self {
        let Some(specs) = value.get("agent_specs").and_then(Value::as_array) else {
            warn!("Planner output has no agent_specs array; treating as empty");
            return Self::default();
        };

        let agent_specs = specs
            .iter()
            .enumerate()
            .filter_map(|(index, spec)| {
                let obj = spec.as_object()?;
                let channel_id = match obj.get("channel_id").and_then(Value::as_str) {
                    Some(id) => id.to_string(),
                    None => {
                        let fallback = format!("channel_{}", index + 1);
                        warn!(channel = %fallback, "Agent spec without channel_id");
                        fallback
                    }
                };
                let agents = obj
                    .get("agents")
                    .and_then(Value::as_array)
                    .map(|items| items.iter().filter_map(AgentSpecItem::from_value).collect())
                    .unwrap_or_default();
                Some(AgentSpec { channel_id, agents })
            })
            .collect();

        Self { agent_specs }
    }

    pub fn channel_count(&self) -> usize {
        self.agent_specs.len()
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn lenient_list<T>(value: Option<&Value>, what: &str, read: fn(&Value) -> Option<T>) -> Vec<T> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let parsed = read(item);
            if parsed.is_none() {
                warn!(item = %item, "Dropping malformed {}", what);
            }
            parsed
        })
        .collect()
}

fn lenient_observer(value: &Value) -> Option<ObserverSpec> {
    value.as_object()?;
    Some(ObserverSpec {
        counters: string_list(value.get("counters")),
        gauges: string_list(value.get("gauges")),
        events: string_list(value.get("events")),
        notes: str_field(value, "notes").unwrap_or_default(),
    })
}
