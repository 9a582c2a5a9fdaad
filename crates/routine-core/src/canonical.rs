//! Canonical per-channel specs.
//!
//! These are produced by an upstream normalization layer and are trusted
//! as-is; the compiler only reads them to feed a planner backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, RoutineError};

/// One channel's canonical specification. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSpec {
    /// Channel id, e.g. `search_bid_guardian`.
    pub id: String,

    pub tagline: String,

    #[serde(default)]
    pub required_features: Map<String, Value>,

    #[serde(default)]
    pub success_metrics: Map<String, Value>,

    #[serde(default)]
    pub timeline: Map<String, Value>,

    /// Arrow-separated tool chains, e.g. `ga4.pull → compute.check`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workflow_brief: Vec<String>,

    /// Tool id to planning-time hints.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tools: BTreeMap<String, ToolHint>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kpis: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critic_hints: Option<CriticHints>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observer_hints: Option<ObserverHints>,
}

/// Planning-time hint for one tool. Loose on purpose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ToolHint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Parameter name to type name, e.g. `{ "campaignId": "number" }`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, String>,

    /// Output name to type name, e.g. `{ "roas": "number" }`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, String>,
}

/// Planner-consumable critic hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CriticHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bid_change_pct: Option<f64>,

    /// Flag value that must be present before acting, e.g. `low`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only_when_flag: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub require_inputs: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_brand_safety: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_seed: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Planner-consumable observer hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ObserverHints {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sinks: Vec<ObserverSink>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Where an observer would ship its data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObserverSink {
    Console,
    Jsonl {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
    Webhook {
        url: String,
    },
}

impl CanonicalSpec {
    /// Create a builder.
    pub fn builder(id: impl Into<String>) -> CanonicalSpecBuilder {
        CanonicalSpecBuilder::new(id)
    }

    /// Shallow sanity check. Full validation happens upstream.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(RoutineError::InvalidPlannerOutput {
                message: "canonical spec id cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for [`CanonicalSpec`] with a fluent API.
#[derive(Debug)]
pub struct CanonicalSpecBuilder {
    spec: CanonicalSpec,
}

impl CanonicalSpecBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            spec: CanonicalSpec {
                id: id.into(),
                tagline: String::new(),
                required_features: Map::new(),
                success_metrics: Map::new(),
                timeline: Map::new(),
                workflow_brief: Vec::new(),
                tools: BTreeMap::new(),
                kpis: Vec::new(),
                critic_hints: None,
                observer_hints: None,
            },
        }
    }

    pub fn tagline(mut self, tagline: impl Into<String>) -> Self {
        self.spec.tagline = tagline.into();
        self
    }

    /// Add one arrow-separated tool chain.
    pub fn brief(mut self, chain: impl Into<String>) -> Self {
        self.spec.workflow_brief.push(chain.into());
        self
    }

    pub fn tool(mut self, id: impl Into<String>, hint: ToolHint) -> Self {
        self.spec.tools.insert(id.into(), hint);
        self
    }

    pub fn kpi(mut self, kpi: impl Into<String>) -> Self {
        self.spec.kpis.push(kpi.into());
        self
    }

    pub fn critic_hints(mut self, hints: CriticHints) -> Self {
        self.spec.critic_hints = Some(hints);
        self
    }

    pub fn observer_hints(mut self, hints: ObserverHints) -> Self {
        self.spec.observer_hints = Some(hints);
        self
    }

    pub fn feature(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.spec.required_features.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Result<CanonicalSpec> {
        self.spec.validate()?;
        Ok(self.spec)
    }
}
