//! Thin REST facade in front of the session actors: create a session from
//! an inline quiz definition, and let a would-be host or player probe a pin
//! before opening the WebSocket. Everything past this point is WebSocket
//! traffic (`ws.rs`).

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::session::quiz::{Quiz, RawQuestion};
use crate::session::ProbeResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub questions: Vec<RawQuestion>,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub pin: String,
}

pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, AppError> {
    let quiz = Quiz::new(req.questions).map_err(|err| AppError::BadRequest(err.to_string()))?;
    let pin = state
        .directory
        .write()
        .await
        .create_session(quiz, state.timings, state.limits, std::sync::Arc::clone(&state.directory))
        .map_err(|err| AppError::Internal(err.to_string()))?;
    Ok(Json(CreateSessionResponse { pin }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Lobby,
    AlreadyStarted,
}

#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub status: ProbeStatus,
}

pub async fn probe_session(
    State(state): State<AppState>,
    Path(pin): Path<String>,
) -> Result<Json<ProbeResponse>, AppError> {
    let handle = state
        .directory
        .read()
        .await
        .lookup(&pin)
        .ok_or_else(|| AppError::NotFound(format!("no session with pin {pin}")))?;

    let result = handle
        .probe()
        .await
        .ok_or_else(|| AppError::Internal("session actor did not reply to probe".into()))?;

    let status = match result {
        ProbeResult::Lobby => ProbeStatus::Lobby,
        ProbeResult::AlreadyStarted => ProbeStatus::AlreadyStarted,
    };
    Ok(Json(ProbeResponse { status }))
}
