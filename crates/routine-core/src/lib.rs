//! # Routine Core
//!
//! Data model shared by the routine compiler crates.
//!
//! - [`CanonicalSpec`] - Per-channel input spec
//! - [`PlannerOutput`] - Role-tagged agent items proposed by a planner backend
//! - [`RoutinePlan`] - Globally ordered, contiguously numbered steps
//! - [`Reference`] - Parsed `$<step>.<field>` handle
//! - [`ArtifactSet`] - Generated files of one compile
//! - [`RoutineError`] - Compile-time error types

pub mod agents;
pub mod artifact;
pub mod canonical;
pub mod error;
pub mod plan;
pub mod reference;
pub mod types;

// Re-exports for convenience
pub use agents::{AgentProfile, AgentSpec, AgentSpecItem, CriticRuleDraft, PlannerOutput};
pub use artifact::ArtifactSet;
pub use canonical::{
    CanonicalSpec, CanonicalSpecBuilder, CriticHints, ObserverHints, ObserverSink, ToolHint,
};
pub use error::{Result, RoutineError};
pub use plan::{PlannedStep, RoutinePlan, RoutineStep, StepId};
pub use reference::{Reference, DEFAULT_OUTPUT, REFERENCE_SIGIL};
pub use types::*;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::agents::{AgentSpec, AgentSpecItem, PlannerOutput};
    pub use crate::artifact::ArtifactSet;
    pub use crate::canonical::CanonicalSpec;
    pub use crate::error::{Result, RoutineError};
    pub use crate::plan::{PlannedStep, RoutinePlan, RoutineStep, StepId};
    pub use crate::reference::Reference;
    pub use crate::types::{AgentRole, CriticRule, ObserverSpec, Severity};
}
