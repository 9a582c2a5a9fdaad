//! Application state: the in-memory run store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use routine_core::{ArtifactSet, CriticRule, ObserverSpec, RoutinePlan};
use routine_planner::flatten::ChannelContribution;
use routine_scaffold::CompileSummary;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::config::NodeConfig;
use crate::engine::Engine;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Compiled runs by id.
    pub runs: Arc<RwLock<HashMap<Uuid, RunRecord>>>,

    /// The compile pipeline.
    pub engine: Arc<Engine>,

    pub config: Arc<NodeConfig>,
}

/// One compile, kept for browsing and dry runs.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub summary: CompileSummary,
    pub artifacts: ArtifactSet,
    pub channels: Vec<ChannelContribution>,

    /// Kept so the run can be interpreted without re-parsing `steps.json`.
    pub plan: RoutinePlan,
    pub rules: Vec<CriticRule>,
    pub observer: Option<ObserverSpec>,
}

impl AppState {
    pub fn new(engine: Engine, config: NodeConfig) -> Self {
        Self {
            runs: Arc::new(RwLock::new(HashMap::new())),
            engine: Arc::new(engine),
            config: Arc::new(config),
        }
    }

    /// Store a run, evicting the oldest beyond `max_runs`.
    pub async fn store_run(&self, record: RunRecord) {
        let mut runs = self.runs.write().await;
        runs.insert(record.id, record);

        while runs.len() > self.config.max_runs {
            let oldest = runs
                .values()
                .min_by_key(|r| r.created_at)
                .map(|r| r.id);
            match oldest {
                Some(id) => {
                    debug!(run = %id, "Evicting oldest run");
                    runs.remove(&id);
                }
                None => break,
            }
        }
    }

    pub async fn get_run(&self, id: Uuid) -> Option<RunRecord> {
        let runs = self.runs.read().await;
        runs.get(&id).cloned()
    }

    /// All runs, oldest first.
    pub async fn list_runs(&self) -> Vec<RunRecord> {
        let runs = self.runs.read().await;
        let mut records: Vec<RunRecord> = runs.values().cloned().collect();
        records.sort_by_key(|r| r.created_at);
        records
    }
}
