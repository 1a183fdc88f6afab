//! Liveness endpoint.
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use notes_common::PingBody;
use tracing::error;

use crate::AppState;

/// `GET /api/ping`
pub async fn ping(State(state): State<Arc<AppState>>) -> (StatusCode, Json<PingBody>) {
    match state.storage.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(PingBody {
                status: "OK".to_string(),
                message: "server running, storage reachable".to_string(),
            }),
        ),
        Err(e) => {
            error!(error = %e, "storage ping failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(PingBody {
                    status: "ERROR".to_string(),
                    message: "server running, storage unreachable".to_string(),
                }),
            )
        }
    }
}
