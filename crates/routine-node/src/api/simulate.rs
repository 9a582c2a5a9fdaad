//! Dry-run endpoint: interprets a stored run with canned tool results.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use routine_runtime::{
    FnTool, Interpreter, ObserverSnapshot, RunOutcome, StubObserver, ToolContext, ToolSet,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use super::{run_not_found, ApiError};
use crate::state::AppState;

/// Request for a dry run.
#[derive(Debug, Default, Deserialize)]
pub struct SimulateRequest {
    /// Initial context entries, e.g. `{"$0.budget": 100}`.
    #[serde(default)]
    pub seeds: Map<String, Value>,

    /// Result returned by each tool id. Tools not listed are unbound.
    #[serde(default)]
    pub stub_results: BTreeMap<String, Value>,
}

/// Response from a dry run.
#[derive(Debug, Serialize)]
pub struct SimulateResponse {
    pub run_id: Uuid,
    pub completed: bool,
    pub outcome: Option<RunOutcome>,
    pub error: Option<String>,
    /// Step at which the run aborted.
    pub failed_step: Option<u32>,
    pub observer: Option<ObserverSnapshot>,
}

/// Interpret a stored run without touching real tools.
pub async fn simulate_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SimulateRequest>,
) -> Result<Json<SimulateResponse>, ApiError> {
    let run = state.get_run(id).await.ok_or_else(|| run_not_found(id))?;

    let mut tools = ToolSet::new();
    for (tool, result) in req.stub_results {
        tools = tools.with(tool, FnTool::new(move |_cx: ToolContext| Ok(result.clone())));
    }

    let mut interpreter = Interpreter::new(run.plan.clone(), tools).with_rules(run.rules.clone());
    let observer = run.observer.as_ref().map(|spec| Arc::new(StubObserver::from_spec(spec)));
    if let Some(observer) = &observer {
        interpreter = interpreter.with_hooks(observer.clone());
    }

    info!("🧪 Simulating run {} ({} steps)", id, run.plan.len());
    let result = interpreter.run(req.seeds).await;
    let snapshot = match &observer {
        Some(observer) => Some(observer.snapshot().await),
        None => None,
    };

    let response = match result {
        Ok(outcome) => SimulateResponse {
            run_id: id,
            completed: true,
            outcome: Some(outcome),
            error: None,
            failed_step: None,
            observer: snapshot,
        },
        Err(err) => SimulateResponse {
            run_id: id,
            completed: false,
            outcome: None,
            failed_step: Some(err.step().get()),
            error: Some(err.to_string()),
            observer: snapshot,
        },
    };
    Ok(Json(response))
}

