//! Generated workflow: Search guardian
//!
//! Runs the routine plan step by step on `routine_runtime`.

#![allow(unused_imports, unused_variables)]

use std::sync::Arc;

use routine_runtime::prelude::*;

use super::critics;
use super::observer;
use crate::tools::{ga4_pull, ComputeCheck, GAdsUpdateBid};

/// Run the routine. `seeds` pre-populate the run context.
pub async fn run(seeds: Map<String, Value>) -> Result<RunOutcome, RunError> {
    let mut rt = Runtime::new(seeds, critics::critic_set())
        .with_hooks(Arc::new(observer::observer()));
    rt.start().await;

    // Step 1: ga4.pull
    {
        let step = StepInfo::new(1, "ga4.pull", "search:search-planner");
        rt.before_step(&step).await;
        let inputs = rt.resolve(&Runtime::literal("{\"campaignId\":\"$campaign\"}"));
        let result = rt.invoke(&step, ga4_pull(inputs)).await?;
        rt.record_outputs(step.id, &["roas"], &result);
        rt.run_critics(&step, &result)?;
        rt.after_step(&step, &result).await;
    }

    // Step 2: compute.check
    {
        let step = StepInfo::new(2, "compute.check", "search:search-planner");
        rt.before_step(&step).await;
        let inputs = rt.resolve(&Runtime::literal("{\"roas\":\"$1.roas\"}"));
        let result = rt.invoke(&step, ComputeCheck.execute(ToolContext::new(inputs))).await?;
        rt.record_outputs(step.id, &["flag"], &result);
        rt.run_critics(&step, &result)?;
        rt.after_step(&step, &result).await;
    }

    // Step 3: gAds.updateBid
    {
        let step = StepInfo::new(3, "gAds.updateBid", "search:search-planner");
        rt.before_step(&step).await;
        let inputs = rt.resolve(&Runtime::literal("{\"pct\":-20}"));
        let result = if rt.condition(&step, "$2.flag == 'low'") {
            rt.invoke(&step, GAdsUpdateBid.execute(ToolContext::new(inputs))).await?
        } else {
            Value::Null
        };
        rt.record_outputs(step.id, &[], &result);
        rt.run_critics(&step, &result)?;
        rt.after_step(&step, &result).await;
    }

    // Step 4: amc.customScore
    {
        let step = StepInfo::new(4, "amc.customScore", "amc:amc-planner");
        rt.before_step(&step).await;
        let inputs = rt.resolve(&Runtime::literal("{\"seed\":\"$1.roas\"}"));
        // No binding for tool "amc.customScore".
        let result = rt.not_implemented(&step);
        rt.record_outputs(step.id, &[], &result);
        rt.run_critics(&step, &result)?;
        rt.after_step(&step, &result).await;
    }

    Ok(rt.finish().await)
}
