//! Tools invoked by routine steps.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::ToolError;

/// What a tool receives: the step's inputs with references resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolContext {
    pub inputs: Value,
}

impl ToolContext {
    pub fn new(inputs: Value) -> Self {
        Self { inputs }
    }

    /// Input field by name.
    pub fn input(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name)
    }
}

/// A concrete tool integration.
#[async_trait]
pub trait Tool: Send + Sync {
    async fn execute(&self, cx: ToolContext) -> Result<Value, ToolError>;
}

/// Adapter turning a plain function into a [`Tool`].
pub struct FnTool<F>(F);

impl<F> FnTool<F>
where
    F: Fn(ToolContext) -> Result<Value, ToolError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> Tool for FnTool<F>
where
    F: Fn(ToolContext) -> Result<Value, ToolError> + Send + Sync,
{
    async fn execute(&self, cx: ToolContext) -> Result<Value, ToolError> {
        (self.0)(cx)
    }
}

/// Tools available to a plan-driven run, by tool id.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a tool.
    pub fn register(&mut self, id: impl Into<String>, tool: Arc<dyn Tool>) {
        self.tools.insert(id.into(), tool);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, id: impl Into<String>, tool: impl Tool + 'static) -> Self {
        self.register(id, Arc::new(tool));
        self
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tools.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&String> = self.tools.keys().collect();
        ids.sort();
        f.debug_struct("ToolSet").field("tools", &ids).finish()
    }
}

/// Result recorded for a step whose tool has no binding.
pub fn not_implemented(tool: &str) -> Value {
    json!({ "status": "not_implemented", "tool": tool })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_tool() {
        let tools = ToolSet::new().with(
            "compute.check",
            FnTool::new(|cx: ToolContext| {
                let roas = cx.input("roas").and_then(Value::as_f64).unwrap_or(0.0);
                Ok(json!({ "flag": if roas < 2.0 { "low" } else { "ok" } }))
            }),
        );
        let tool = tools.get("compute.check").unwrap();
        let out = tool.execute(ToolContext::new(json!({"roas": 1.5}))).await.unwrap();
        assert_eq!(out, json!({"flag": "low"}));
        assert!(!tools.contains("ga4.pull"));
    }

    #[test]
    fn test_not_implemented_marker() {
        let marker = not_implemented("amc.createLookAlike");
        assert_eq!(marker, json!({"status": "not_implemented", "tool": "amc.createLookAlike"}));
    }
}
