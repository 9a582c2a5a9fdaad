//! Lifecycle hooks and the stub observer.
//!
//! Hooks see the run read-only. A hook that errors or panics is logged and
//! otherwise ignored; it never aborts the run.

use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::lock::Mutex;
use futures::FutureExt;
use routine_core::{ObserverSpec, StepId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::RunContext;
use crate::error::HookError;

/// Identity of the step a hook is called for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepInfo {
    pub id: StepId,
    pub tool: String,
    /// `<channel>:<planner>` label from flattening.
    pub agent: String,
}

impl StepInfo {
    pub fn new(id: u32, tool: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            id: StepId(id),
            tool: tool.into(),
            agent: agent.into(),
        }
    }
}

/// Lifecycle callbacks. Every method defaults to a no-op.
#[async_trait]
pub trait Hooks: Send + Sync {
    /// Once, before the first step.
    async fn run_start(&self, _context: &RunContext) -> Result<(), HookError> {
        Ok(())
    }

    /// Before a step's condition and invocation.
    async fn step_start(&self, _step: &StepInfo, _context: &RunContext) -> Result<(), HookError> {
        Ok(())
    }

    /// After outputs are recorded and critics have run.
    async fn step_end(
        &self,
        _step: &StepInfo,
        _result: &Value,
        _context: &RunContext,
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// Once, after the last step of a run that was not aborted.
    async fn run_end(&self, _context: &RunContext) -> Result<(), HookError> {
        Ok(())
    }
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl Hooks for NoopHooks {}

/// Await a hook, swallowing its error or panic.
pub(crate) async fn isolate<F>(point: &'static str, hook: F)
where
    F: Future<Output = Result<(), HookError>>,
{
    match AssertUnwindSafe(hook).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(hook = point, error = %err, "Hook failed; continuing"),
        Err(_) => warn!(hook = point, "Hook panicked; continuing"),
    }
}

/// An event the stub observer let through its filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedEvent {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Point-in-time view of a [`StubObserver`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObserverSnapshot {
    pub counters: BTreeMap<String, u64>,
    pub gauges: BTreeMap<String, f64>,
    pub events: Vec<ObservedEvent>,
}

/// Minimal observer seeded from an [`ObserverSpec`].
///
/// Counters and gauges start at zero. The first declared counter is bumped
/// on every `step_start`. Numeric result fields named like a gauge update
/// that gauge on `step_end`. Events outside the declared list are dropped.
#[derive(Debug, Default)]
pub struct StubObserver {
    counter_names: Vec<String>,
    allowed_events: Vec<String>,
    state: Mutex<ObserverSnapshot>,
}

impl StubObserver {
    pub fn builder() -> StubObserverBuilder {
        StubObserverBuilder::default()
    }

    pub fn from_spec(spec: &ObserverSpec) -> Self {
        let mut builder = Self::builder();
        for name in &spec.counters {
            builder = builder.counter(name);
        }
        for name in &spec.gauges {
            builder = builder.gauge(name);
        }
        for name in &spec.events {
            builder = builder.event(name);
        }
        builder.build()
    }

    /// Record an event if its name is in the allowed list. Returns whether
    /// it was kept.
    pub async fn emit_event(&self, name: &str, payload: Option<Value>) -> bool {
        if !self.allowed_events.iter().any(|allowed| allowed == name) {
            return false;
        }
        self.state.lock().await.events.push(ObservedEvent {
            name: name.to_string(),
            payload,
        });
        true
    }

    pub async fn snapshot(&self) -> ObserverSnapshot {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl Hooks for StubObserver {
    async fn run_start(&self, _context: &RunContext) -> Result<(), HookError> {
        self.emit_event("run_start", None).await;
        Ok(())
    }

    async fn step_start(&self, step: &StepInfo, _context: &RunContext) -> Result<(), HookError> {
        if let Some(first) = self.counter_names.first() {
            let mut state = self.state.lock().await;
            *state.counters.entry(first.clone()).or_insert(0) += 1;
        }
        self.emit_event("step_start", Some(Value::from(step.id.get()))).await;
        Ok(())
    }

    async fn step_end(
        &self,
        step: &StepInfo,
        result: &Value,
        _context: &RunContext,
    ) -> Result<(), HookError> {
        {
            let mut state = self.state.lock().await;
            for (name, gauge) in state.gauges.iter_mut() {
                if let Some(value) = result.get(name).and_then(Value::as_f64) {
                    *gauge = value;
                }
            }
        }
        self.emit_event("step_end", Some(Value::from(step.id.get()))).await;
        Ok(())
    }

    async fn run_end(&self, context: &RunContext) -> Result<(), HookError> {
        debug!(keys = context.len(), "Observer flush");
        self.emit_event("run_end", None).await;
        Ok(())
    }
}

/// Builder for [`StubObserver`]. This is what generated `observer.rs` calls.
#[derive(Debug, Default)]
pub struct StubObserverBuilder {
    counters: Vec<String>,
    gauges: Vec<String>,
    events: Vec<String>,
}

impl StubObserverBuilder {
    pub fn counter(mut self, name: impl Into<String>) -> Self {
        self.counters.push(name.into());
        self
    }

    pub fn gauge(mut self, name: impl Into<String>) -> Self {
        self.gauges.push(name.into());
        self
    }

    pub fn event(mut self, name: impl Into<String>) -> Self {
        self.events.push(name.into());
        self
    }

    pub fn build(self) -> StubObserver {
        let snapshot = ObserverSnapshot {
            counters: self.counters.iter().map(|name| (name.clone(), 0)).collect(),
            gauges: self.gauges.iter().map(|name| (name.clone(), 0.0)).collect(),
            events: Vec::new(),
        };
        StubObserver {
            counter_names: self.counters,
            allowed_events: self.events,
            state: Mutex::new(snapshot),
        }
    }
}
