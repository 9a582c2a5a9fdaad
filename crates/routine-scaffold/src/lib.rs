//! # Routine Scaffold
//!
//! Turns a flattened plan, critic rules and an observer spec into a
//! generated template: Rust sources over `routine-runtime`, the step list,
//! a manifest and a README.
//!
//! - [`ToolRegistry`] - Tool id to call binding
//! - [`TemplateBuilder`] - Renders an [`ArtifactSet`](routine_core::ArtifactSet)
//! - [`render`] - Individual file renderers

pub mod builder;
pub mod registry;
pub mod render;

pub use builder::{CompileSummary, Compiled, ScaffoldConfig, ScaffoldInput, TemplateBuilder};
pub use registry::{CallShape, ResolvedTools, ToolBinding, ToolRegistry, DEFAULT_TOOLS_MODULE};
