//! Routine steps and the globally ordered plan.
//!
//! A [`RoutinePlan`] is an append-only arena: the id of a step is its
//! 1-based position, so ids are contiguous and never reused.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::reference::Reference;

/// Global execution id of a planned step (1-based).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StepId(pub u32);

impl StepId {
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A step as the planner proposes it. It carries no id: whatever `id` the
/// planner wrote is ignored, and ids are assigned by flattening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineStep {
    /// Tool identifier, e.g. `ga4.pull`.
    pub tool: String,

    /// Parameter name to literal value or reference string.
    #[serde(default)]
    pub inputs: Map<String, Value>,

    /// Names under which result fields are published.
    #[serde(default)]
    pub outputs: Vec<String>,

    /// Guard expression; the tool only runs when it evaluates true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RoutineStep {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            inputs: Map::new(),
            outputs: Vec::new(),
            condition: None,
            description: None,
        }
    }

    /// Read a planner-proposed step. Only a non-blank string `tool` is
    /// required. Null or wrong-typed `inputs`, `outputs`, `condition` and
    /// `description` read as absent, and non-string output names are skipped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let tool = obj.get("tool").and_then(Value::as_str)?;
        if tool.trim().is_empty() {
            return None;
        }
        let text = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
        };
        let outputs = obj
            .get("outputs")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();

        Some(Self {
            tool: tool.to_string(),
            inputs: obj.get("inputs").and_then(Value::as_object).cloned().unwrap_or_default(),
            outputs,
            condition: text("condition"),
            description: text("description"),
        })
    }

    /// Add an input (literal or reference string).
    pub fn input(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }

    /// Declare an output name.
    pub fn output(mut self, name: impl Into<String>) -> Self {
        self.outputs.push(name.into());
        self
    }

    pub fn condition(mut self, expr: impl Into<String>) -> Self {
        self.condition = Some(expr.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

/// A step placed in the global plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedStep {
    pub id: StepId,
    pub tool: String,
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Originating channel and role. Used for logging only.
    #[serde(default)]
    pub agent: String,
}

impl PlannedStep {
    /// Step references appearing in inputs (at any depth) and the condition.
    pub fn references(&self) -> Vec<Reference> {
        let mut refs = Vec::new();
        for value in self.inputs.values() {
            collect_value_refs(value, &mut refs);
        }
        if let Some(condition) = &self.condition {
            refs.extend(Reference::scan(condition));
        }
        refs
    }
}

fn collect_value_refs(value: &Value, out: &mut Vec<Reference>) {
    match value {
        Value::String(s) => {
            if let Some(r) = Reference::parse(s) {
                out.push(r);
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_value_refs(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_value_refs(v, out)),
        _ => {}
    }
}

/// The flattened, globally ordered plan.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<PlannedStep>", into = "Vec<PlannedStep>")]
pub struct RoutinePlan {
    steps: Vec<PlannedStep>,
}

impl RoutinePlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a planner step, allocating the next global id.
    pub fn push(&mut self, step: RoutineStep, agent: impl Into<String>) -> StepId {
        let id = StepId(self.steps.len() as u32 + 1);
        self.steps.push(PlannedStep {
            id,
            tool: step.tool,
            inputs: step.inputs,
            outputs: step.outputs,
            condition: step.condition,
            description: step.description,
            agent: agent.into(),
        });
        id
    }

    /// O(1) lookup by id.
    pub fn get(&self, id: StepId) -> Option<&PlannedStep> {
        let index = (id.0 as usize).checked_sub(1)?;
        self.steps.get(index)
    }

    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlannedStep> {
        self.steps.iter()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Distinct tool ids in first-appearance order.
    pub fn distinct_tools(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.steps
            .iter()
            .map(|s| s.tool.as_str())
            .filter(|tool| seen.insert(*tool))
            .collect()
    }
}

impl<'a> IntoIterator for &'a RoutinePlan {
    type Item = &'a PlannedStep;
    type IntoIter = std::slice::Iter<'a, PlannedStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

impl TryFrom<Vec<PlannedStep>> for RoutinePlan {
    type Error = String;

    fn try_from(steps: Vec<PlannedStep>) -> Result<Self, Self::Error> {
        for (index, step) in steps.iter().enumerate() {
            let expected = index as u32 + 1;
            if step.id.0 != expected {
                return Err(format!(
                    "step ids must be contiguous from 1: expected {}, found {}",
                    expected, step.id
                ));
            }
        }
        Ok(Self { steps })
    }
}

impl From<RoutinePlan> for Vec<PlannedStep> {
    fn from(plan: RoutinePlan) -> Self {
        plan.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_assigns_contiguous_ids() {
        let mut plan = RoutinePlan::new();
        let a = plan.push(RoutineStep::new("ga4.pull"), "search:planner");
        let b = plan.push(RoutineStep::new("compute.check"), "search:planner");
        assert_eq!(a, StepId(1));
        assert_eq!(b, StepId(2));
        assert_eq!(plan.get(StepId(2)).unwrap().tool, "compute.check");
        assert!(plan.get(StepId(0)).is_none());
        assert!(plan.get(StepId(3)).is_none());
    }

    #[test]
    fn test_planner_supplied_id_is_ignored() {
        let mut plan = RoutinePlan::new();
        let step = RoutineStep::from_value(&json!({ "id": 42, "tool": "ga4.pull" })).unwrap();
        assert_eq!(plan.push(step, "x"), StepId(1));
    }

    #[test]
    fn test_from_value_treats_bad_fields_as_absent() {
        let step = RoutineStep::from_value(&json!({
            "id": "s1",
            "tool": "compute.check",
            "inputs": null,
            "outputs": ["flag", 7],
            "condition": 3,
            "description": null
        }))
        .unwrap();
        assert_eq!(step.tool, "compute.check");
        assert!(step.inputs.is_empty());
        assert_eq!(step.outputs, vec!["flag"]);
        assert!(step.condition.is_none());
        assert!(step.description.is_none());

        assert!(RoutineStep::from_value(&json!({ "tool": "  " })).is_none());
        assert!(RoutineStep::from_value(&json!({ "tool": 5 })).is_none());
        assert!(RoutineStep::from_value(&json!("ga4.pull")).is_none());
    }

    #[test]
    fn test_distinct_tools_first_appearance() {
        let mut plan = RoutinePlan::new();
        for tool in ["B", "A", "B", "C"] {
            plan.push(RoutineStep::new(tool), "c:p");
        }
        assert_eq!(plan.distinct_tools(), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_references() {
        let mut plan = RoutinePlan::new();
        plan.push(RoutineStep::new("ga4.pull").output("roas"), "c:p");
        plan.push(
            RoutineStep::new("compute.check")
                .input("roas", "$1.roas")
                .input("nested", json!({ "list": ["$1.roas", 3] }))
                .condition("$1.roas < 4"),
            "c:p",
        );
        let second = plan.get(StepId(2)).unwrap();
        assert_eq!(second.references().len(), 3);
    }

    #[test]
    fn test_deserialize_rejects_gaps() {
        let ok: RoutinePlan =
            serde_json::from_value(json!([{ "id": 1, "tool": "a" }, { "id": 2, "tool": "b" }]))
                .unwrap();
        assert_eq!(ok.len(), 2);

        let gap = serde_json::from_value::<RoutinePlan>(json!([
            { "id": 1, "tool": "a" },
            { "id": 3, "tool": "b" }
        ]));
        assert!(gap.is_err());
    }
}
