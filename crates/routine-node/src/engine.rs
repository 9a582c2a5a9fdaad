//! The compile pipeline: planner, flattener, extractor and scaffolder.

use std::collections::BTreeMap;
use std::sync::Arc;

use routine_core::{
    CanonicalSpec, CriticRule, ObserverSpec, PlannerOutput, Result, RoutineError, RoutinePlan,
};
use routine_planner::flatten::ChannelContribution;
use routine_planner::{
    extract_guardrails, propose_agent_specs, BriefPlanner, Flattener, PlannerBackend,
};
use routine_scaffold::{Compiled, ScaffoldConfig, ScaffoldInput, TemplateBuilder, ToolRegistry};
use serde_json::Value;
use tracing::{error, info, warn};

/// One compile request.
#[derive(Debug, Clone, Default)]
pub struct CompileJob {
    /// Channels to plan. Ignored when `planner_output` is set.
    pub specs: Vec<CanonicalSpec>,

    /// Precomputed planner output; skips the backend.
    pub planner_output: Option<Value>,

    pub title: Option<String>,
    pub variables: BTreeMap<String, String>,
}

/// Everything a compile produced.
#[derive(Debug, Clone)]
pub struct CompileOutcome {
    pub compiled: Compiled,
    pub channels: Vec<ChannelContribution>,
    pub plan: RoutinePlan,
    pub rules: Vec<CriticRule>,
    pub observer: Option<ObserverSpec>,
}

/// The core compile engine.
pub struct Engine {
    backend: Arc<dyn PlannerBackend>,
    flattener: Flattener,
    builder: TemplateBuilder,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Arc::new(BriefPlanner::new()), ScaffoldConfig::default())
    }
}

impl Engine {
    /// Create a new engine.
    pub fn new(backend: Arc<dyn PlannerBackend>, config: ScaffoldConfig) -> Self {
        Self {
            backend,
            flattener: Flattener::new(),
            builder: TemplateBuilder::with_config(ToolRegistry::with_defaults(), config),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.builder.registry()
    }

    /// Run the whole pipeline for one job.
    pub async fn compile(&self, job: CompileJob) -> Result<CompileOutcome> {
        self.run_pipeline(job).await.map_err(|err| {
            if err.is_caller_error() {
                warn!("⚠️ Compile rejected: {}", err);
            } else {
                error!("❌ Compile failed: {}", err);
            }
            err
        })
    }

    async fn run_pipeline(&self, job: CompileJob) -> Result<CompileOutcome> {
        let (raw, output) = match job.planner_output {
            Some(raw) => {
                if !raw.is_object() {
                    return Err(RoutineError::InvalidPlannerOutput {
                        message: "planner output must be a JSON object".to_string(),
                    });
                }
                let output = PlannerOutput::from_value(&raw);
                (raw, output)
            }
            None => {
                if job.specs.is_empty() {
                    return Err(RoutineError::InvalidPlannerOutput {
                        message: "either specs or planner_output is required".to_string(),
                    });
                }
                for spec in &job.specs {
                    spec.validate()?;
                }
                info!("📋 Planning {} channels with {}", job.specs.len(), self.backend.name());
                propose_agent_specs(self.backend.as_ref(), &job.specs).await?
            }
        };

        let report = self.flattener.flatten(&output);
        for channel in &report.channels {
            if let Some(reason) = channel.skipped {
                warn!(channel = %channel.channel_id, ?reason, "Channel contributed no steps");
            }
        }

        let guardrails = extract_guardrails(&output);
        let mut input = ScaffoldInput::new(report.plan.clone())
            .rules(guardrails.rules.clone())
            .observer(guardrails.observer.clone())
            .agents(raw)
            .variables(job.variables);
        if let Some(title) = job.title {
            input = input.title(title);
        }

        let compiled = self.builder.compile(&input)?;
        info!(
            "✅ Compiled '{}' with {} steps into {} files",
            compiled.summary.title,
            compiled.summary.step_count,
            compiled.artifacts.len()
        );

        Ok(CompileOutcome {
            compiled,
            channels: report.channels,
            plan: report.plan,
            rules: guardrails.rules,
            observer: guardrails.observer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routine_planner::{FailingPlanner, FixturePlanner};
    use serde_json::json;

    fn spec() -> CanonicalSpec {
        CanonicalSpec::builder("search")
            .tagline("Search guardian")
            .brief("ga4.pull → compute.check")
            .kpi("roas")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_compile_from_specs() {
        let outcome = Engine::default()
            .compile(CompileJob {
                specs: vec![spec()],
                ..CompileJob::default()
            })
            .await
            .unwrap();
        assert_eq!(outcome.plan.len(), 2);
        assert!(outcome.compiled.artifacts.get("agents.json").is_some());
    }

    #[tokio::test]
    async fn test_requires_specs_or_output() {
        let err = Engine::default().compile(CompileJob::default()).await.unwrap_err();
        assert!(matches!(err, RoutineError::InvalidPlannerOutput { .. }));
        assert!(err.is_caller_error());
    }

    #[tokio::test]
    async fn test_empty_output_is_nothing_to_compile() {
        let engine = Engine::new(
            Arc::new(FixturePlanner::new(json!({"agent_specs": []}))),
            ScaffoldConfig::default(),
        );
        let err = engine
            .compile(CompileJob {
                specs: vec![spec()],
                ..CompileJob::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RoutineError::NothingToCompile { .. }));
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let engine = Engine::new(Arc::new(FailingPlanner::new("quota")), ScaffoldConfig::default());
        let err = engine
            .compile(CompileJob {
                specs: vec![spec()],
                ..CompileJob::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RoutineError::PlannerFailed { .. }));
        assert!(!err.is_caller_error());
    }
}
