pub mod api;
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod health;
pub mod session;
pub mod state;
pub mod ws;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use config::ServerConfig;
use state::AppState;

/// Assemble the router and its shared state, the same split the teacher's
/// `lib.rs` exposes so integration tests can stand up a real server without
/// going through `main`.
pub fn build_app(config: &ServerConfig) -> (Router, AppState) {
    let state = AppState::new(config);

    let router = Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/v1/sessions", post(api::create_session))
        .route("/api/v1/sessions/{pin}/probe", get(api::probe_session))
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    (router, state)
}
