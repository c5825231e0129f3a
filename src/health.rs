//! Liveness/readiness endpoints, adapted from the teacher's `health.rs` to
//! report session counts instead of room/GitHub-poller counts.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub session_count: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let session_count = state.directory.read().await.session_count();
    Json(HealthResponse { status: "ok", session_count })
}

pub async fn readiness_check() -> &'static str {
    "ready"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse { status: "ok", session_count: 3 };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"session_count\":3"));
    }
}
