//! # Routine Node
//!
//! HTTP front end for the routine template compiler.

pub mod api;
pub mod config;
pub mod engine;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use routine_planner::BriefPlanner;
use routine_scaffold::ScaffoldConfig;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::NodeConfig;
pub use engine::{CompileJob, CompileOutcome, Engine};
pub use state::{AppState, RunRecord};

/// Build application state with the offline brief planner.
pub fn default_state(config: NodeConfig) -> AppState {
    let scaffold = ScaffoldConfig {
        default_title: config.default_title.clone(),
        ..ScaffoldConfig::default()
    };
    let engine = Engine::new(Arc::new(BriefPlanner::new()), scaffold);
    AppState::new(engine, config)
}

/// Run the node server until it is stopped.
pub async fn run_server(config: NodeConfig) -> anyhow::Result<()> {
    info!("🚀 Routine node starting...");

    let addr = config.addr;
    let app = create_router(default_state(config));

    info!("🌐 Listening on http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(api::health::health_check))
        .route("/api/v1/tools", get(api::tools::list_tools))
        .route("/api/v1/compile", post(api::compile::compile))
        .route("/api/v1/runs", get(api::runs::list_runs))
        .route("/api/v1/runs/:id", get(api::runs::get_run))
        .route("/api/v1/runs/:id/file", get(api::runs::get_file))
        .route("/api/v1/runs/:id/simulate", post(api::simulate::simulate_run))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
