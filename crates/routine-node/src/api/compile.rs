//! Compile endpoint.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use routine_core::CanonicalSpec;
use routine_scaffold::CompileSummary;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::ApiError;
use crate::engine::CompileJob;
use crate::state::{AppState, RunRecord};

/// Request to compile a routine template.
#[derive(Debug, Deserialize)]
pub struct CompileRequest {
    /// Channel specs, planned by the node's backend.
    #[serde(default)]
    pub specs: Vec<CanonicalSpec>,

    /// Precomputed planner output. Takes precedence over `specs`.
    pub planner_output: Option<Value>,

    pub title: Option<String>,

    /// Written to `.env.example`.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

/// Response for a successful compile.
#[derive(Debug, Serialize)]
pub struct CompileResponse {
    pub run_id: Uuid,
    pub summary: CompileSummary,
    pub files: BTreeMap<String, String>,
}

/// Compile specs or planner output into an artifact set.
pub async fn compile(
    State(state): State<AppState>,
    Json(req): Json<CompileRequest>,
) -> Result<(StatusCode, Json<CompileResponse>), ApiError> {
    let outcome = state
        .engine
        .compile(CompileJob {
            specs: req.specs,
            planner_output: req.planner_output,
            title: req.title,
            variables: req.variables,
        })
        .await?;

    let id = Uuid::new_v4();
    let response = CompileResponse {
        run_id: id,
        summary: outcome.compiled.summary.clone(),
        files: outcome.compiled.artifacts.files.clone(),
    };

    state
        .store_run(RunRecord {
            id,
            created_at: Utc::now(),
            summary: outcome.compiled.summary,
            artifacts: outcome.compiled.artifacts,
            channels: outcome.channels,
            plan: outcome.plan,
            rules: outcome.rules,
            observer: outcome.observer,
        })
        .await;
    info!("📥 Stored run {}", id);

    Ok((StatusCode::CREATED, Json(response)))
}
