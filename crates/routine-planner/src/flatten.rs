//! Plan flattening: merges every channel's planner steps into one globally
//! ordered [`RoutinePlan`].
//!
//! Inputs and conditions are copied verbatim. Reference strings are never
//! rewritten, so `$2.flag` always means global step 2. A channel whose steps
//! reference ids outside its own range is kept as-is and reported.

use routine_core::{PlannerOutput, Reference, RoutinePlan, StepId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Configuration for the flattener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlattenConfig {
    /// Report references that point outside the referencing channel's ids.
    pub check_reference_scope: bool,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            check_reference_scope: true,
        }
    }
}

/// Why a channel contributed no steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The channel has no planner item.
    NoPlanner,
    /// The planner item has no (usable) steps.
    NoSteps,
}

/// What one channel contributed to the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelContribution {
    pub channel_id: String,

    /// Ids assigned to this channel's steps, in order.
    pub step_ids: Vec<StepId>,

    pub skipped: Option<SkipReason>,

    /// References from this channel's steps to ids it does not own.
    pub foreign_references: Vec<Reference>,
}

/// Result of flattening.
#[derive(Debug, Clone)]
pub struct FlattenReport {
    pub plan: RoutinePlan,
    pub channels: Vec<ChannelContribution>,
}

impl FlattenReport {
    /// Channels that contributed at least one step.
    pub fn contributing_channels(&self) -> impl Iterator<Item = &ChannelContribution> {
        self.channels.iter().filter(|c| !c.step_ids.is_empty())
    }
}

/// Merges per-channel planner steps into one plan.
#[derive(Debug, Clone, Default)]
pub struct Flattener {
    config: FlattenConfig,
}

impl Flattener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FlattenConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FlattenConfig {
        &self.config
    }

    /// Flatten planner output. Never fails: channels without planner steps
    /// are skipped.
    pub fn flatten(&self, output: &PlannerOutput) -> FlattenReport {
        let mut plan = RoutinePlan::new();
        let mut channels = Vec::with_capacity(output.agent_specs.len());

        for spec in &output.agent_specs {
            let mut contribution = ChannelContribution {
                channel_id: spec.channel_id.clone(),
                step_ids: Vec::new(),
                skipped: None,
                foreign_references: Vec::new(),
            };

            let Some((profile, steps)) = spec.planner() else {
                debug!(channel = %spec.channel_id, "No planner item; skipping channel");
                contribution.skipped = Some(SkipReason::NoPlanner);
                channels.push(contribution);
                continue;
            };
            if steps.is_empty() {
                debug!(channel = %spec.channel_id, "Planner has no steps; skipping channel");
                contribution.skipped = Some(SkipReason::NoSteps);
                channels.push(contribution);
                continue;
            }

            let role_name = if profile.name.is_empty() {
                "planner"
            } else {
                profile.name.as_str()
            };
            let agent = format!("{}:{}", spec.channel_id, role_name);

            for step in steps {
                let id = plan.push(step.clone(), agent.clone());
                contribution.step_ids.push(id);
            }

            if self.config.check_reference_scope {
                contribution.foreign_references = foreign_references(&plan, &contribution.step_ids);
                for reference in &contribution.foreign_references {
                    warn!(
                        channel = %spec.channel_id,
                        reference = %reference,
                        "Step references an id outside its channel; references are not rewritten"
                    );
                }
            }

            channels.push(contribution);
        }

        info!(
            "Flattened {} channels into {} steps",
            output.agent_specs.len(),
            plan.len()
        );

        FlattenReport { plan, channels }
    }
}

/// Flatten with the default configuration and return just the plan.
pub fn flatten_to_routine_plan(output: &PlannerOutput) -> RoutinePlan {
    Flattener::new().flatten(output).plan
}

fn foreign_references(plan: &RoutinePlan, owned: &[StepId]) -> Vec<Reference> {
    let (Some(first), Some(last)) = (owned.first(), owned.last()) else {
        return Vec::new();
    };
    owned
        .iter()
        .filter_map(|id| plan.get(*id))
        .flat_map(|step| step.references())
        .filter(|r| r.step < *first || r.step > *last)
        .collect()
}
