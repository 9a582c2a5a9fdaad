//! Generated observer stub. Swap in a real telemetry sink as needed.

use routine_runtime::prelude::*;

pub fn observer() -> StubObserver {
    StubObserver::builder()
        .counter("steps_started")
        .gauge("roas")
        .event("step_end")
        .build()
}

// Notes from planner:
// Watch ROAS
// sink: console
