//! Run browsing endpoints.

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use routine_core::RoutineError;
use routine_planner::flatten::ChannelContribution;
use routine_scaffold::CompileSummary;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{run_not_found, ApiError};
use crate::state::AppState;

/// One entry of the run list.
#[derive(Debug, Serialize)]
pub struct RunListItem {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub step_count: usize,
    pub digest: String,
}

/// Full view of one run.
#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub summary: CompileSummary,
    pub channels: Vec<ChannelContribution>,
    pub files: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub path: String,
}

/// List stored runs, oldest first.
pub async fn list_runs(State(state): State<AppState>) -> Json<Vec<RunListItem>> {
    let runs = state
        .list_runs()
        .await
        .into_iter()
        .map(|r| RunListItem {
            id: r.id,
            title: r.summary.title.clone(),
            created_at: r.created_at,
            step_count: r.summary.step_count,
            digest: r.summary.digest.clone(),
        })
        .collect();
    Json(runs)
}

/// Get one run.
pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RunResponse>, ApiError> {
    let run = state.get_run(id).await.ok_or_else(|| run_not_found(id))?;
    Ok(Json(RunResponse {
        id: run.id,
        created_at: run.created_at,
        files: run.artifacts.paths().into_iter().map(String::from).collect(),
        summary: run.summary,
        channels: run.channels,
    }))
}

/// Get one generated file as text.
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<FileQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if query.path.trim().is_empty() {
        return Err(ApiError::BadRequest("path must not be empty".to_string()));
    }
    let run = state.get_run(id).await.ok_or_else(|| run_not_found(id))?;
    let content = run
        .artifacts
        .get(&query.path)
        .map(str::to_string)
        .ok_or_else(|| RoutineError::NotFound {
            resource_type: "file".to_string(),
            id: query.path.clone(),
        })?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], content))
}
