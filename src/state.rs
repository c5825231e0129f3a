//! `AppState`: the one handle cloned into every axum handler, the same
//! shape as the teacher's `state.rs`.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::session::directory::{SessionDirectory, SharedDirectory};
use crate::session::{SessionLimits, Timings};

#[derive(Clone)]
pub struct AppState {
    pub directory: SharedDirectory,
    pub timings: Timings,
    pub limits: SessionLimits,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            directory: Arc::new(tokio::sync::RwLock::new(SessionDirectory::new())),
            timings: config.timings.to_timings(),
            limits: SessionLimits { max_participants: config.limits.max_participants_per_session },
        }
    }
}
