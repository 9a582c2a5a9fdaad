//! The run context: every value a run has produced, keyed by
//! `$<step>.<name>`.

use std::collections::BTreeMap;

use routine_core::reference::is_reference_like;
use routine_core::Reference;
use serde_json::{Map, Value};
use tracing::warn;

/// Write-once key/value store for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunContext {
    values: BTreeMap<String, Value>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a context from caller-supplied values.
    pub fn with_seeds(seeds: Map<String, Value>) -> Self {
        Self {
            values: seeds.into_iter().collect(),
        }
    }

    /// Insert a value. Keys are write-once: a second write is ignored and
    /// `false` is returned.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();
        if self.values.contains_key(&key) {
            warn!(key = %key, "Ignoring second write to run context key");
            return false;
        }
        self.values.insert(key, value);
        true
    }

    /// Insert under a reference's key.
    pub fn record(&mut self, reference: &Reference, value: Value) -> bool {
        self.insert(reference.key(), value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Copy the context out as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(self.values.clone().into_iter().collect())
    }

    /// Replace every `$`-prefixed string in `value` by an exact-key lookup.
    ///
    /// A miss drops the key inside objects and becomes `null` inside arrays
    /// and at the top level. Nothing else is touched.
    pub fn resolve(&self, value: &Value) -> Value {
        self.resolve_inner(value).unwrap_or(Value::Null)
    }

    fn resolve_inner(&self, value: &Value) -> Option<Value> {
        match value {
            Value::String(s) if is_reference_like(s) => self.values.get(s).cloned(),
            Value::Array(items) => Some(Value::Array(
                items
                    .iter()
                    .map(|item| self.resolve_inner(item).unwrap_or(Value::Null))
                    .collect(),
            )),
            Value::Object(map) => Some(Value::Object(
                map.iter()
                    .filter_map(|(k, v)| self.resolve_inner(v).map(|v| (k.clone(), v)))
                    .collect(),
            )),
            other => Some(other.clone()),
        }
    }
}

impl From<RunContext> for BTreeMap<String, Value> {
    fn from(context: RunContext) -> Self {
        context.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routine_core::StepId;
    use serde_json::json;

    fn context() -> RunContext {
        let mut ctx = RunContext::new();
        ctx.insert("$1.roas", json!(4.2));
        ctx
    }

    #[test]
    fn test_resolution_is_exact_match() {
        let resolved = context().resolve(&json!({"x": "$1.roas", "y": "$9.missing"}));
        assert_eq!(resolved, json!({"x": 4.2}));
    }

    #[test]
    fn test_resolution_recurses() {
        let resolved = context().resolve(&json!({
            "nested": {"a": ["$1.roas", "$2.none", 7]},
            "literal": "plain",
            "prefix": "$1.roasted"
        }));
        assert_eq!(resolved, json!({"nested": {"a": [4.2, null, 7]}, "literal": "plain"}));
    }

    #[test]
    fn test_top_level_miss_is_null() {
        assert_eq!(context().resolve(&json!("$3.flag")), Value::Null);
    }

    #[test]
    fn test_write_once() {
        let mut ctx = context();
        assert!(!ctx.insert("$1.roas", json!(0)));
        assert_eq!(ctx.get("$1.roas"), Some(&json!(4.2)));
        assert!(ctx.record(&Reference::new(StepId(2), "flag"), json!("low")));
        assert_eq!(ctx.get("$2.flag"), Some(&json!("low")));
    }

    #[test]
    fn test_seeds() {
        let mut seeds = Map::new();
        seeds.insert("$campaign".to_string(), json!(42));
        let ctx = RunContext::with_seeds(seeds);
        assert_eq!(ctx.resolve(&json!({"id": "$campaign"})), json!({"id": 42}));
    }
}
