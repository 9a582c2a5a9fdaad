//! Critic rules evaluated after every step.

use routine_core::{CriticRule, StepId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::context::RunContext;
use crate::error::RunError;
use crate::expr::{self, Expr, Scope};

/// A warn-severity rule that fired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticFinding {
    pub rule_id: String,
    pub rule_name: String,
    pub step: StepId,
    pub tool: String,
    pub action: Option<String>,
}

#[derive(Debug, Clone)]
struct ArmedRule {
    rule: CriticRule,
    /// `None` when the condition does not parse; such a rule never fires.
    expr: Option<Expr>,
}

/// The rule list of one routine, with conditions parsed once.
#[derive(Debug, Clone, Default)]
pub struct CriticSet {
    rules: Vec<ArmedRule>,
}

impl CriticSet {
    pub fn new(rules: Vec<CriticRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let expr = rule.armed_condition().and_then(|source| match expr::parse(source) {
                    Ok(expr) => Some(expr),
                    Err(err) => {
                        warn!(
                            rule = %rule.id,
                            error = %err,
                            "Critic condition does not parse; rule is inert"
                        );
                        None
                    }
                });
                ArmedRule { rule, expr }
            })
            .collect();
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> impl Iterator<Item = &CriticRule> {
        self.rules.iter().map(|armed| &armed.rule)
    }

    /// Run every armed rule against the step's result, in order.
    ///
    /// Returns the warn findings, or the first `error` rule that fired.
    pub fn check(
        &self,
        step: StepId,
        tool: &str,
        context: &RunContext,
        result: &Value,
    ) -> Result<Vec<CriticFinding>, RunError> {
        let scope = Scope::with_result(context, result);
        let mut findings = Vec::new();

        for ArmedRule { rule, expr } in &self.rules {
            let Some(expr) = expr else {
                continue;
            };
            if !expr.test(&scope) {
                continue;
            }

            let action = rule.action.clone().unwrap_or_default();
            if rule.severity.is_blocking() {
                error!(
                    rule = %rule.id,
                    step = %step,
                    tool = %tool,
                    "[CRITIC:error] {} :: {}",
                    rule.name,
                    action
                );
                return Err(RunError::GuardrailViolation {
                    rule_id: rule.id.clone(),
                    rule_name: rule.name.clone(),
                    step,
                    tool: tool.to_string(),
                    action,
                });
            }

            warn!(
                rule = %rule.id,
                step = %step,
                tool = %tool,
                "[CRITIC:warn] {} :: {}",
                rule.name,
                action
            );
            findings.push(CriticFinding {
                rule_id: rule.id.clone(),
                rule_name: rule.name.clone(),
                step,
                tool: tool.to_string(),
                action: rule.action.clone(),
            });
        }

        debug!(step = %step, fired = findings.len(), "Critics checked");
        Ok(findings)
    }
}

impl From<Vec<CriticRule>> for CriticSet {
    fn from(rules: Vec<CriticRule>) -> Self {
        Self::new(rules)
    }
}
