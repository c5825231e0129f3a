//! `SessionDirectory`: the map from pin to running session actor.
//!
//! Grounded on the teacher's `RoomManager` (room_manager.rs) — a
//! `RwLock`-guarded map of codes to handles, with retry-on-collision code
//! generation and a `reap` path that also tears down the actor behind a
//! handle. Unlike the teacher, each session here *is* its own tokio task
//! (spawned by [`SessionDirectory::create_session`]) rather than a struct
//! mutated under the directory's lock, so the directory only ever touches
//! channel senders, never session state directly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{oneshot, RwLock};

use super::quiz::Quiz;
use super::{ProbeResult, Session, SessionEvent, SessionLimits, Timings};

const CODE_LEN: usize = 6;
const MAX_CODE_ATTEMPTS: u32 = 50;

pub type SharedDirectory = Arc<RwLock<SessionDirectory>>;

/// A live reference to a session actor. Cloning is cheap: it's a channel
/// sender clone, mirroring the teacher's `Arc`-wrapped room handles.
#[derive(Clone)]
pub struct SessionHandle {
    tx: tokio::sync::mpsc::UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    pub(crate) fn new(tx: tokio::sync::mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { tx }
    }

    pub fn sender(&self) -> tokio::sync::mpsc::UnboundedSender<SessionEvent> {
        self.tx.clone()
    }

    pub async fn probe(&self) -> Option<ProbeResult> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(SessionEvent::Probe { reply: reply_tx }).ok()?;
        reply_rx.await.ok()
    }
}

#[derive(Default)]
pub struct SessionDirectory {
    sessions: HashMap<String, SessionHandle>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for `quiz`, spawn its actor task, and register it
    /// under a freshly generated, currently-unused pin.
    pub fn create_session(
        &mut self,
        quiz: Quiz,
        timings: Timings,
        limits: SessionLimits,
        directory: SharedDirectory,
    ) -> Result<String, CreateSessionError> {
        let code = self.generate_unique_code()?;
        let handle = Session::spawn(code.clone(), quiz, timings, limits, directory);
        self.sessions.insert(code.clone(), handle);
        Ok(code)
    }

    pub fn lookup(&self, code: &str) -> Option<SessionHandle> {
        self.sessions.get(code).cloned()
    }

    /// Remove a session's directory entry and tell its actor to stop, if it
    /// hasn't already. Called both by the actor's own reap timer and, in
    /// principle, by any future administrative sweep.
    pub fn reap(&mut self, code: &str) {
        if let Some(handle) = self.sessions.remove(code) {
            let _ = handle.tx.send(SessionEvent::Reap);
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn generate_unique_code(&self) -> Result<String, CreateSessionError> {
        let mut rng = rand::rng();
        for _ in 0..MAX_CODE_ATTEMPTS {
            let candidate: u32 = rng.random_range(0..10u32.pow(CODE_LEN as u32));
            let code = format!("{candidate:0width$}", width = CODE_LEN);
            if !self.sessions.contains_key(&code) {
                return Ok(code);
            }
        }
        Err(CreateSessionError::CodeSpaceExhausted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CreateSessionError {
    #[error("no unused session code could be generated")]
    CodeSpaceExhausted,
}

/// Spawn the background sweep that reaps a session `reap_after` past its
/// `final` transition. Lives here (rather than inline in `Session`) so tests
/// can drive it with a short duration without touching production code.
pub fn schedule_reap(code: String, directory: SharedDirectory, reap_after: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(reap_after).await;
        directory.write().await.reap(&code);
    });
}
