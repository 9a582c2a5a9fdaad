//! # Routine Planner
//!
//! Turns planner output into what the scaffolder consumes.
//!
//! - [`backend`] - Planner backends ([`BriefPlanner`], fixtures)
//! - [`flatten`] - Per-channel steps into one globally numbered plan
//! - [`extract`] - Critic rules and the observer spec

pub mod backend;
pub mod brief;
pub mod extract;
pub mod flatten;

pub use backend::{propose_agent_specs, FailingPlanner, FixturePlanner, PlannerBackend};
pub use brief::BriefPlanner;
pub use extract::{extract_critic_rules, extract_guardrails, first_observer, Guardrails};
pub use flatten::{flatten_to_routine_plan, FlattenConfig, FlattenReport, Flattener};
