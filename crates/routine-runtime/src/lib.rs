//! # Routine Runtime
//!
//! The library generated workflows link against, plus an [`Interpreter`]
//! that runs a [`RoutinePlan`](routine_core::RoutinePlan) directly with the
//! same semantics.
//!
//! - [`RunContext`] - Write-once `$<step>.<name>` store
//! - [`expr`] - Sandboxed condition/guard expressions
//! - [`CriticSet`] - Guardrails run after every step
//! - [`Hooks`] / [`StubObserver`] - Lifecycle callbacks
//! - [`Runtime`] - Per-step primitives

pub mod context;
pub mod critics;
pub mod error;
pub mod expr;
pub mod hooks;
pub mod interpreter;
pub mod runtime;
pub mod tool;

pub use context::RunContext;
pub use critics::{CriticFinding, CriticSet};
pub use error::{HookError, RunError, ToolError};
pub use expr::{evaluate_condition, evaluate_guard};
pub use hooks::{Hooks, NoopHooks, ObserverSnapshot, StepInfo, StubObserver, StubObserverBuilder};
pub use interpreter::Interpreter;
pub use runtime::{RunOutcome, Runtime};
pub use tool::{FnTool, Tool, ToolContext, ToolSet};

/// Everything generated code needs in scope.
pub mod prelude {
    pub use crate::critics::CriticSet;
    pub use crate::error::{RunError, ToolError};
    pub use crate::hooks::{StepInfo, StubObserver};
    pub use crate::runtime::{RunOutcome, Runtime};
    pub use crate::tool::{Tool, ToolContext};
    pub use routine_core::{CriticRule, Severity};
    pub use serde_json::{Map, Value};
}
