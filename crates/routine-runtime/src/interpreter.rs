//! Plan-driven execution with the same step sequence as generated code.

use std::sync::Arc;

use routine_core::{CriticRule, PlannedStep, RoutinePlan};
use serde_json::{Map, Value};
use tracing::info;

use crate::critics::CriticSet;
use crate::error::RunError;
use crate::hooks::{Hooks, StepInfo};
use crate::runtime::{RunOutcome, Runtime};
use crate::tool::{ToolContext, ToolSet};

/// Runs a [`RoutinePlan`] directly, without code generation.
pub struct Interpreter {
    plan: RoutinePlan,
    tools: ToolSet,
    rules: Vec<CriticRule>,
    hooks: Vec<Arc<dyn Hooks>>,
}

impl Interpreter {
    pub fn new(plan: RoutinePlan, tools: ToolSet) -> Self {
        Self {
            plan,
            tools,
            rules: Vec::new(),
            hooks: Vec::new(),
        }
    }

    pub fn with_rules(mut self, rules: Vec<CriticRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn Hooks>) -> Self {
        self.hooks.push(hooks);
        self
    }

    pub fn plan(&self) -> &RoutinePlan {
        &self.plan
    }

    /// Execute every step in order. Stops at the first `error` critic or
    /// tool failure.
    pub async fn run(&self, seeds: Map<String, Value>) -> Result<RunOutcome, RunError> {
        info!(steps = self.plan.len(), "Interpreting routine plan");
        let mut rt = Runtime::new(seeds, CriticSet::new(self.rules.clone()));
        for hooks in &self.hooks {
            rt = rt.with_hooks(Arc::clone(hooks));
        }

        rt.start().await;
        for step in self.plan.iter() {
            self.run_step(&mut rt, step).await?;
        }
        Ok(rt.finish().await)
    }

    async fn run_step(&self, rt: &mut Runtime, step: &PlannedStep) -> Result<(), RunError> {
        let info = StepInfo {
            id: step.id,
            tool: step.tool.clone(),
            agent: step.agent.clone(),
        };
        rt.before_step(&info).await;

        let inputs = rt.resolve(&Value::Object(step.inputs.clone()));
        let enabled = match &step.condition {
            Some(condition) => rt.condition(&info, condition),
            None => true,
        };
        let result = if !enabled {
            Value::Null
        } else if let Some(tool) = self.tools.get(&step.tool) {
            rt.invoke(&info, tool.execute(ToolContext::new(inputs))).await?
        } else {
            rt.not_implemented(&info)
        };

        let outputs: Vec<&str> = step.outputs.iter().map(String::as_str).collect();
        rt.record_outputs(step.id, &outputs, &result);
        rt.run_critics(&info, &result)?;
        rt.after_step(&info, &result).await;
        Ok(())
    }
}
