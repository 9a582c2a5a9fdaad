//! Error types for routine runs.

use routine_core::StepId;
use thiserror::Error;

/// Why a run ended early.
#[derive(Error, Debug)]
pub enum RunError {
    /// An `error`-severity critic rule fired.
    #[error("Guardrail '{rule_name}' ({rule_id}) fired on step {step} {tool}: {action}")]
    GuardrailViolation {
        rule_id: String,
        rule_name: String,
        step: StepId,
        tool: String,
        action: String,
    },

    /// A bound tool returned an error.
    #[error("Tool '{tool}' failed on step {step}: {source}")]
    ToolFailed {
        step: StepId,
        tool: String,
        #[source]
        source: ToolError,
    },
}

impl RunError {
    /// The step the run stopped at.
    pub fn step(&self) -> StepId {
        match self {
            RunError::GuardrailViolation { step, .. } | RunError::ToolFailed { step, .. } => *step,
        }
    }
}

/// Error returned by a tool implementation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upstream call failed: {0}")]
    Upstream(String),

    #[error("{0}")]
    Other(String),
}

/// Error returned by a lifecycle hook. Always swallowed by the runtime.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Hook failed: {0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_error_step() {
        let err = RunError::ToolFailed {
            step: StepId(3),
            tool: "ga4.pull".to_string(),
            source: ToolError::Upstream("timeout".to_string()),
        };
        assert_eq!(err.step(), StepId(3));
        assert!(err.to_string().contains("timeout"));
    }
}
