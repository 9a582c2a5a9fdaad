//! Tool binding registry: how generated code calls each tool.

use std::collections::BTreeMap;

use routine_core::RoutinePlan;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Module generated code imports tool symbols from.
pub const DEFAULT_TOOLS_MODULE: &str = "crate::tools";

/// How a tool is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallShape {
    /// `ga4_pull(inputs)`, an async fn.
    Direct,
    /// `ComputeCheck.execute(ToolContext::new(inputs))`, a `Tool` value.
    Execute,
}

/// Everything code generation needs to call one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolBinding {
    /// Tool id as it appears in plans, e.g. `ga4.pull`.
    pub id: String,
    pub symbol_name: String,
    pub module_path: String,
    pub call_shape: CallShape,
}

impl ToolBinding {
    /// Binding with a symbol derived from the id.
    pub fn new(id: impl Into<String>, call_shape: CallShape) -> Self {
        let id = id.into();
        let symbol_name = match call_shape {
            CallShape::Direct => snake_symbol(&id),
            CallShape::Execute => pascal_symbol(&id),
        };
        Self {
            id,
            symbol_name,
            module_path: DEFAULT_TOOLS_MODULE.to_string(),
            call_shape,
        }
    }

    pub fn with_module(mut self, module_path: impl Into<String>) -> Self {
        self.module_path = module_path.into();
        self
    }

    pub fn with_symbol(mut self, symbol_name: impl Into<String>) -> Self {
        self.symbol_name = symbol_name.into();
        self
    }

    /// Fully qualified symbol.
    pub fn path(&self) -> String {
        format!("{}::{}", self.module_path, self.symbol_name)
    }

    /// Rust expression calling the tool by its full path with `inputs_expr`.
    /// The expression is a future of `Result<Value, ToolError>`.
    pub fn invoke(&self, inputs_expr: &str) -> String {
        self.invoke_as(&self.path(), inputs_expr)
    }

    /// Same as [`invoke`](Self::invoke), naming the symbol as `callee`.
    pub fn invoke_as(&self, callee: &str, inputs_expr: &str) -> String {
        match self.call_shape {
            CallShape::Direct => format!("{}({})", callee, inputs_expr),
            CallShape::Execute => format!("{}.execute(ToolContext::new({}))", callee, inputs_expr),
        }
    }
}

/// Bindings resolved for one plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTools {
    /// Bound tools, deduped in first-appearance order.
    pub bound: Vec<ToolBinding>,
    /// Tool ids with no binding, deduped in first-appearance order.
    pub unbound: Vec<String>,
}

impl ResolvedTools {
    pub fn get(&self, id: &str) -> Option<&ToolBinding> {
        self.bound.iter().find(|binding| binding.id == id)
    }

    pub fn bound_ids(&self) -> Vec<String> {
        self.bound.iter().map(|binding| binding.id.clone()).collect()
    }
}

/// Static table of tool id to binding.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    bindings: BTreeMap<String, ToolBinding>,
}

const DEFAULT_EXECUTE_TOOLS: [&str; 15] = [
    "compute.check",
    "gAds.updateBid",
    "dv360.fetchStats",
    "compute.deltaCpm",
    "compute.checkInflation",
    "dv360.patchDealBid",
    "bigquery.logDealPatch",
    "meta.pullAdsetMetrics",
    "compute.checkFatigue",
    "meta.swapCreative",
    "amc.fetchPurchasers",
    "compute.seedFormatter",
    "amc.createLookAlike",
    "amc.exportToAdsConsole",
    "bigquery.logLookalikeBuild",
];

impl ToolRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The marketing tool set: search, DV360, Meta and AMC channels.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ToolBinding::new("ga4.pull", CallShape::Direct));
        for id in DEFAULT_EXECUTE_TOOLS {
            registry.register(ToolBinding::new(id, CallShape::Execute));
        }
        registry
    }

    /// Add or replace a binding.
    pub fn register(&mut self, binding: ToolBinding) {
        if self.bindings.contains_key(&binding.id) {
            warn!(tool = %binding.id, "Replacing tool binding");
        }
        self.bindings.insert(binding.id.clone(), binding);
    }

    /// Exact-match lookup.
    pub fn resolve(&self, tool_id: &str) -> Option<&ToolBinding> {
        self.bindings.get(tool_id)
    }

    /// Resolve every distinct tool of a plan.
    pub fn resolve_plan(&self, plan: &RoutinePlan) -> ResolvedTools {
        let mut resolved = ResolvedTools::default();
        for tool in plan.distinct_tools() {
            match self.resolve(tool) {
                Some(binding) => resolved.bound.push(binding.clone()),
                None => {
                    debug!(tool = %tool, "No binding; emitting placeholder");
                    resolved.unbound.push(tool.to_string());
                }
            }
        }
        resolved
    }

    /// All bindings, sorted by id.
    pub fn catalog(&self) -> Vec<&ToolBinding> {
        self.bindings.values().collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

fn segments(id: &str) -> impl Iterator<Item = &str> {
    id.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|segment| !segment.is_empty())
}

/// `gAds.updateBid` -> `g_ads_update_bid`.
pub fn snake_symbol(id: &str) -> String {
    let mut out = String::new();
    for segment in segments(id) {
        if !out.is_empty() {
            out.push('_');
        }
        let mut prev_lower = false;
        for c in segment.chars() {
            if c.is_ascii_uppercase() {
                if prev_lower {
                    out.push('_');
                }
                out.push(c.to_ascii_lowercase());
                prev_lower = false;
            } else {
                out.push(c);
                prev_lower = true;
            }
        }
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// `gAds.updateBid` -> `GAdsUpdateBid`.
pub fn pascal_symbol(id: &str) -> String {
    let mut out = String::new();
    for segment in segments(id) {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.extend(chars);
        }
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, 'T');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use routine_core::RoutineStep;

    #[test]
    fn test_default_table() {
        let registry = ToolRegistry::with_defaults();
        assert_eq!(registry.len(), 16);

        let ga4 = registry.resolve("ga4.pull").unwrap();
        assert_eq!(ga4.call_shape, CallShape::Direct);
        assert_eq!(ga4.invoke("inputs"), "crate::tools::ga4_pull(inputs)");

        let check = registry.resolve("compute.check").unwrap();
        assert_eq!(
            check.invoke("inputs"),
            "crate::tools::ComputeCheck.execute(ToolContext::new(inputs))"
        );
        assert!(registry.resolve("GA4.PULL").is_none());
    }

    #[test]
    fn test_symbols() {
        assert_eq!(snake_symbol("gAds.updateBid"), "g_ads_update_bid");
        assert_eq!(snake_symbol("dv360.fetchStats"), "dv360_fetch_stats");
        assert_eq!(pascal_symbol("amc.createLookAlike"), "AmcCreateLookAlike");
        assert_eq!(pascal_symbol("dv360.patchDealBid"), "Dv360PatchDealBid");
    }

    #[test]
    fn test_resolve_plan_dedupes_in_first_appearance_order() {
        let mut registry = ToolRegistry::new();
        for id in ["a.tool", "b.tool", "c.tool"] {
            registry.register(ToolBinding::new(id, CallShape::Execute));
        }
        let mut plan = RoutinePlan::new();
        for id in ["b.tool", "a.tool", "b.tool", "c.tool", "x.unknown", "x.unknown"] {
            plan.push(RoutineStep::new(id), "ch:planner");
        }

        let resolved = registry.resolve_plan(&plan);
        assert_eq!(resolved.bound_ids(), vec!["b.tool", "a.tool", "c.tool"]);
        assert_eq!(resolved.unbound, vec!["x.unknown"]);
    }

    #[test]
    fn test_catalog_is_sorted() {
        let registry = ToolRegistry::with_defaults();
        let ids: Vec<&str> = registry.catalog().iter().map(|b| b.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_custom_module() {
        let binding =
            ToolBinding::new("meta.swapCreative", CallShape::Execute).with_module("my_tools");
        assert_eq!(binding.path(), "my_tools::MetaSwapCreative");
        assert_eq!(
            binding.invoke_as("MetaSwapCreative", "inputs"),
            "MetaSwapCreative.execute(ToolContext::new(inputs))"
        );
    }
}
