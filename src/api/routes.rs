//! Dashboard handlers and response types.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::Snapshot;
use crate::config::ExcludeList;
use crate::watcher::SnapshotStore;

/// Shared dashboard state: the snapshot store plus the immutable exclude
/// list, both fixed at startup.
#[derive(Clone)]
pub struct DashboardState {
    pub snapshots: SnapshotStore,
    pub excluded: Arc<ExcludeList>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

/// GET /api/v1/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct SnapshotsResponse {
    pub snapshots: Vec<Snapshot>,
}

/// GET /api/v1/snapshots
pub async fn snapshots(State(state): State<DashboardState>) -> Json<SnapshotsResponse> {
    Json(SnapshotsResponse {
        snapshots: state.snapshots.all().await,
    })
}

#[derive(Debug, Serialize)]
pub struct ExcludedResponse {
    pub excluded: Vec<String>,
}

/// GET /api/v1/excluded
pub async fn excluded(State(state): State<DashboardState>) -> Json<ExcludedResponse> {
    Json(ExcludedResponse {
        excluded: state.excluded.list.clone(),
    })
}
