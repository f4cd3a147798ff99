//! Read-only dashboard over the last snapshots.
//!
//! Not part of the monitoring core: the dashboard observes the snapshot
//! store, it never mutates it. Endpoints:
//!
//! - `GET /api/v1/health` - static liveness indicator
//! - `GET /api/v1/snapshots` - last snapshot per category
//! - `GET /api/v1/excluded` - resource ids omitted from monitoring

#[cfg(feature = "dashboard")]
pub mod routes;

#[cfg(feature = "dashboard")]
pub use routes::{DashboardState, HealthResponse, SnapshotsResponse};

#[cfg(feature = "dashboard")]
use std::net::SocketAddr;

/// Bind and serve the dashboard in a background task.
///
/// Returns the bound address (useful when the configured port is 0).
#[cfg(feature = "dashboard")]
pub async fn spawn_dashboard(
    bind_addr: SocketAddr,
    state: DashboardState,
) -> anyhow::Result<SocketAddr> {
    use axum::{Router, routing::get};
    use tower_http::trace::TraceLayer;
    use tracing::info;

    let app = Router::new()
        .route("/api/v1/health", get(routes::health))
        .route("/api/v1/snapshots", get(routes::snapshots))
        .route("/api/v1/excluded", get(routes::excluded))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("dashboard listening on {addr}");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("dashboard server error: {e}");
        }
    });

    Ok(addr)
}
