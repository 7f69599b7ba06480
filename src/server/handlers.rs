use crate::app_state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{error, info};

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let uptime = state.start_time.elapsed().unwrap_or_default();
    let response = serde_json::json!({
        "status": "ok",
        "uptime": format!("{}s", uptime.as_secs()),
        "cameras": state.snapshotter.cameras().len(),
    });
    tracing::debug!("Health check response: {:?}", response);
    Json(response)
}

/// Runs a snapshot cycle synchronously and reports its outcome.
pub async fn trigger_snapshot(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    info!("Manual snapshot triggered");

    match state.snapshotter.save_snapshots().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "snapshots saved" })),
        ),
        Err(e) => {
            error!(error = %e, "Manual snapshot failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
        }
    }
}
