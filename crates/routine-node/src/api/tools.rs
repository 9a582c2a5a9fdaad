//! Tool catalog endpoint.

use axum::extract::State;
use axum::Json;
use routine_scaffold::ToolBinding;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct ToolsResponse {
    pub count: usize,
    pub tools: Vec<ToolBinding>,
}

/// List every registered tool binding, sorted by id.
pub async fn list_tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    let tools: Vec<ToolBinding> = state
        .engine
        .registry()
        .catalog()
        .into_iter()
        .cloned()
        .collect();
    Json(ToolsResponse {
        count: tools.len(),
        tools,
    })
}
