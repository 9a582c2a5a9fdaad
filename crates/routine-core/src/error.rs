//! Error types for the routine compiler.

use thiserror::Error;

/// Main error type for compile-time operations.
#[derive(Error, Debug, Clone)]
pub enum RoutineError {
    /// No channel contributed a single planner step.
    #[error("Nothing to compile: {message}")]
    NothingToCompile { message: String },

    /// The planner backend failed to produce output.
    #[error("Planner failed: {message}")]
    PlannerFailed { message: String },

    /// Planner output could not be interpreted at all (not even tolerantly).
    #[error("Invalid planner output: {message}")]
    InvalidPlannerOutput { message: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Resource not found.
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    /// Internal error (should not happen).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RoutineError {
    /// Returns true if the caller supplied something unusable, as opposed to
    /// a failure inside the pipeline.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            RoutineError::NothingToCompile { .. } | RoutineError::InvalidPlannerOutput { .. }
        )
    }

    /// Shorthand for [`RoutineError::NothingToCompile`].
    pub fn nothing_to_compile(message: impl Into<String>) -> Self {
        RoutineError::NothingToCompile {
            message: message.into(),
        }
    }
}

/// Convenience Result type for routine operations.
pub type Result<T> = std::result::Result<T, RoutineError>;

impl From<serde_json::Error> for RoutineError {
    fn from(err: serde_json::Error) -> Self {
        RoutineError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_errors() {
        assert!(RoutineError::nothing_to_compile("empty").is_caller_error());
        assert!(!RoutineError::Internal("boom".to_string()).is_caller_error());
    }

    #[test]
    fn test_from_serde_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: RoutineError = err.into();
        assert!(matches!(err, RoutineError::SerializationError(_)));
    }
}
