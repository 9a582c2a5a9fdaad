//! Common types shared by the planner, the scaffolder and the runtime.

use serde::{Deserialize, Serialize};

/// The four fixed roles an agent item may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Contributes executable routine steps.
    Planner,
    /// Describes how steps are carried out; carries no steps.
    Executor,
    /// Carries guardrail rules.
    Critic,
    /// Carries the telemetry specification.
    Observer,
}

impl AgentRole {
    /// Parse a role tag. Unknown tags yield `None` and are ignored by callers.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "planner" => Some(AgentRole::Planner),
            "executor" => Some(AgentRole::Executor),
            "critic" => Some(AgentRole::Critic),
            "observer" => Some(AgentRole::Observer),
            _ => None,
        }
    }

    /// The wire name of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Planner => "planner",
            AgentRole::Executor => "executor",
            AgentRole::Critic => "critic",
            AgentRole::Observer => "observer",
        }
    }
}

/// Severity of a critic rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Aborts the run when the rule fires.
    Error,
    /// Logged and recorded; the run continues.
    #[default]
    Warn,
}

impl Severity {
    /// Lenient parse: anything other than `error` (any case) is `warn`.
    pub fn parse_lenient(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("error") {
            Severity::Error
        } else {
            Severity::Warn
        }
    }

    /// Returns true if a firing rule of this severity aborts the run.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Severity::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warn => "warn",
        }
    }
}

/// A guardrail rule evaluated after every step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticRule {
    /// Stable identifier (synthesized when the planner omits it).
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Boolean expression over run-context references and `result`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,

    /// Whether a firing rule aborts the run.
    #[serde(default)]
    pub severity: Severity,

    /// Message or remediation hint attached to findings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CriticRule {
    /// Create a warn-severity rule with no condition.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            when: None,
            severity: Severity::Warn,
            action: None,
            description: None,
        }
    }

    /// Set the firing condition.
    pub fn when(mut self, expr: impl Into<String>) -> Self {
        self.when = Some(expr.into());
        self
    }

    /// Set the severity.
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Set the action message.
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The condition, if the rule can fire at all. A rule without a
    /// non-blank `when` is inert.
    pub fn armed_condition(&self) -> Option<&str> {
        self.when
            .as_deref()
            .map(str::trim)
            .filter(|expr| !expr.is_empty())
    }
}

/// Descriptive telemetry specification used to seed the observer stub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ObserverSpec {
    #[serde(default)]
    pub counters: Vec<String>,

    #[serde(default)]
    pub gauges: Vec<String>,

    /// Event names the stub lets through; everything else is filtered.
    #[serde(default)]
    pub events: Vec<String>,

    #[serde(default)]
    pub notes: String,
}

impl ObserverSpec {
    /// Returns true if the spec declares nothing at all.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
            && self.gauges.is_empty()
            && self.events.is_empty()
            && self.notes.trim().is_empty()
    }
}
