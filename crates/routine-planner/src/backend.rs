//! Planner backends: the (external) generative call that turns canonical
//! specs into role-tagged agent items.

use async_trait::async_trait;
use routine_core::{CanonicalSpec, PlannerOutput, Result, RoutineError};
use serde_json::Value;
use tracing::info;

/// Trait for planner backends.
///
/// A backend returns raw, loosely-typed planner output. Callers read it with
/// [`PlannerOutput::from_value`], which tolerates malformed pieces.
#[async_trait]
pub trait PlannerBackend: Send + Sync {
    /// Propose agent specs for the given channels.
    async fn propose(&self, specs: &[CanonicalSpec]) -> Result<Value>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

/// Propose and parse in one go.
pub async fn propose_agent_specs(
    backend: &dyn PlannerBackend,
    specs: &[CanonicalSpec],
) -> Result<(Value, PlannerOutput)> {
    info!("Requesting agent specs from {} for {} channels", backend.name(), specs.len());
    let raw = backend.propose(specs).await?;
    let parsed = PlannerOutput::from_value(&raw);
    Ok((raw, parsed))
}

/// Returns a fixed planner output, whatever the specs.
#[derive(Debug, Clone)]
pub struct FixturePlanner {
    output: Value,
}

impl FixturePlanner {
    pub fn new(output: Value) -> Self {
        Self { output }
    }
}

#[async_trait]
impl PlannerBackend for FixturePlanner {
    async fn propose(&self, _specs: &[CanonicalSpec]) -> Result<Value> {
        Ok(self.output.clone())
    }

    fn name(&self) -> &str {
        "fixture"
    }
}

/// A backend that always fails. Useful for exercising error paths.
#[derive(Debug, Clone)]
pub struct FailingPlanner {
    message: String,
}

impl FailingPlanner {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl PlannerBackend for FailingPlanner {
    async fn propose(&self, _specs: &[CanonicalSpec]) -> Result<Value> {
        Err(RoutineError::PlannerFailed {
            message: self.message.clone(),
        })
    }

    fn name(&self) -> &str {
        "failing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fixture_planner_roundtrip() {
        let fixture = json!({ "agent_specs": [{ "channel_id": "c", "agents": [] }] });
        let backend = FixturePlanner::new(fixture.clone());
        let (raw, parsed) = propose_agent_specs(&backend, &[]).await.unwrap();
        assert_eq!(raw, fixture);
        assert_eq!(parsed.channel_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_planner() {
        let backend = FailingPlanner::new("model unavailable");
        let err = propose_agent_specs(&backend, &[]).await.unwrap_err();
        assert!(matches!(err, RoutineError::PlannerFailed { .. }));
    }
}
