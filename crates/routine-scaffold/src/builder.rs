//! Template builder: plan, rules and observer in, artifact set out.

use std::collections::BTreeMap;

use routine_core::{ArtifactSet, CriticRule, ObserverSpec, Result, RoutineError, RoutinePlan};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::registry::{ResolvedTools, ToolRegistry};
use crate::render::{self, ManifestFields};

/// Configuration for code generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaffoldConfig {
    /// Title used when the caller supplies none.
    pub default_title: String,
    /// Crate name generated code imports the runtime from.
    pub runtime_crate: String,
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            default_title: "Generated Template".to_string(),
            runtime_crate: "routine_runtime".to_string(),
        }
    }
}

/// Everything one compile consumes.
#[derive(Debug, Clone, Default)]
pub struct ScaffoldInput {
    pub plan: RoutinePlan,
    pub rules: Vec<CriticRule>,
    pub observer: Option<ObserverSpec>,
    pub title: Option<String>,
    /// Planner output, emitted verbatim as `agents.json` when present.
    pub agents: Option<Value>,
    /// Emitted as `.env.example` when non-empty.
    pub variables: BTreeMap<String, String>,
}

impl ScaffoldInput {
    pub fn new(plan: RoutinePlan) -> Self {
        Self {
            plan,
            ..Self::default()
        }
    }

    pub fn rules(mut self, rules: Vec<CriticRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn observer(mut self, observer: Option<ObserverSpec>) -> Self {
        self.observer = observer;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn agents(mut self, agents: Value) -> Self {
        self.agents = Some(agents);
        self
    }

    pub fn variables(mut self, variables: BTreeMap<String, String>) -> Self {
        self.variables = variables;
        self
    }
}

/// Short description of a compile, for logs and API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileSummary {
    pub title: String,
    pub step_count: usize,
    /// First-appearance order.
    pub bound_tools: Vec<String>,
    pub unbound_tools: Vec<String>,
    pub rule_count: usize,
    pub observer_present: bool,
    pub files: Vec<String>,
    pub digest: String,
}

/// Output of one compile.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub artifacts: ArtifactSet,
    pub summary: CompileSummary,
}

/// Renders artifact sets using a tool registry.
#[derive(Debug, Clone)]
pub struct TemplateBuilder {
    registry: ToolRegistry,
    config: ScaffoldConfig,
}

impl Default for TemplateBuilder {
    fn default() -> Self {
        Self::new(ToolRegistry::with_defaults())
    }
}

impl TemplateBuilder {
    pub fn new(registry: ToolRegistry) -> Self {
        Self::with_config(registry, ScaffoldConfig::default())
    }

    pub fn with_config(registry: ToolRegistry, config: ScaffoldConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ScaffoldConfig {
        &self.config
    }

    /// Render every file. Fails with `NothingToCompile` on an empty plan.
    pub fn compile(&self, input: &ScaffoldInput) -> Result<Compiled> {
        if input.plan.is_empty() {
            return Err(RoutineError::nothing_to_compile(
                "no channel contributed planner steps",
            ));
        }

        let title = input
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(self.config.default_title.as_str())
            .to_string();

        let tools = self.registry.resolve_plan(&input.plan);
        if !tools.unbound.is_empty() {
            warn!(tools = ?tools.unbound, "Unbound tools will compile to placeholders");
        }

        let runtime_crate = self.config.runtime_crate.as_str();
        let mut artifacts = ArtifactSet::new(title.clone());
        artifacts.insert(render::STEPS_FILE, render::steps_json(&input.plan)?);
        artifacts.insert(
            render::WORKFLOW_FILE,
            render::workflow_rs(&title, &input.plan, &tools, runtime_crate)?,
        );
        artifacts.insert(render::CRITICS_FILE, render::critics_rs(&input.rules, runtime_crate));
        artifacts.insert(
            render::OBSERVER_FILE,
            render::observer_rs(input.observer.as_ref(), runtime_crate),
        );
        artifacts.insert(render::MOD_FILE, render::mod_rs(&title));
        if let Some(agents) = &input.agents {
            artifacts.insert(render::AGENTS_FILE, render::agents_json(agents)?);
        }
        if !input.variables.is_empty() {
            artifacts.insert(render::ENV_FILE, render::env_example(&input.variables));
        }

        let mut files: Vec<String> = artifacts.files.keys().cloned().collect();
        files.push(render::MANIFEST_FILE.to_string());
        files.push(render::README_FILE.to_string());
        files.sort();

        artifacts.insert(
            render::README_FILE,
            render::readme_md(&title, &files, &input.plan, &tools),
        );
        let content_digest = artifacts.digest.clone();
        artifacts.insert(
            render::MANIFEST_FILE,
            render::manifest_json(&ManifestFields {
                title: &title,
                files: &files,
                step_count: input.plan.len(),
                tools: &tools,
                rule_count: input.rules.len(),
                observer: input.observer.is_some(),
                content_digest: &content_digest,
            })?,
        );

        debug!(files = artifacts.len(), digest = %artifacts.digest, "Rendered artifact set");
        let summary = summarize(&title, &input.plan, &tools, input, &artifacts);
        info!(
            title = %summary.title,
            steps = summary.step_count,
            bound = summary.bound_tools.len(),
            unbound = summary.unbound_tools.len(),
            rules = summary.rule_count,
            "Compiled routine template"
        );

        Ok(Compiled { artifacts, summary })
    }
}

fn summarize(
    title: &str,
    plan: &RoutinePlan,
    tools: &ResolvedTools,
    input: &ScaffoldInput,
    artifacts: &ArtifactSet,
) -> CompileSummary {
    CompileSummary {
        title: title.to_string(),
        step_count: plan.len(),
        bound_tools: tools.bound_ids(),
        unbound_tools: tools.unbound.clone(),
        rule_count: input.rules.len(),
        observer_present: input.observer.is_some(),
        files: artifacts.paths().into_iter().map(String::from).collect(),
        digest: artifacts.digest.clone(),
    }
}
