//! The session actor: one tokio task per running quiz, serializing every
//! inbound message, timer firing, and disconnect through a single mpsc
//! channel. Grounded on the teacher's split between `RoomManager` (directory
//! of handles, see `directory.rs`) and `game_loop::run_game_tick_loop` (the
//! per-room task racing a timer against a command channel via
//! `tokio::select!`) — except the teacher runs a fixed-rate tick, while a
//! quiz session schedules one-shot timers whose duration depends on the
//! current question and phase.

pub mod directory;
pub mod quiz;
pub mod scoring;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::codec::{encode_server_message, CorrectPayload, ServerMessage};
use crate::connection::Role;
use directory::{schedule_reap, SharedDirectory};
use quiz::{CorrectAnswer, QuestionKind, Quiz, Selection};

pub use directory::SessionHandle;

const MAX_NAME_LEN: usize = 20;

/// Caps carried from configuration. Kept separate from [`Timings`] since
/// this one bounds a count, not a duration.
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    pub max_participants: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self { max_participants: 100 }
    }
}

/// Outbound payloads are shared by `Arc<str>` clone across every recipient
/// of a broadcast, the same zero-copy idiom the teacher applies to its
/// `Bytes` frames in `forward_broadcasts`.
pub type OutboundSender = mpsc::UnboundedSender<Arc<str>>;

/// Timer durations that differ between production and test runs. Production
/// uses [`Timings::default`]; tests shrink `auto_advance` and `reap` so
/// suites don't block on real wall-clock minutes (paired with
/// `tokio::time::pause`/`advance`).
#[derive(Debug, Clone, Copy)]
pub struct Timings {
    pub auto_reveal: Duration,
    pub auto_advance: Duration,
    pub reap: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            auto_reveal: Duration::from_secs(1),
            auto_advance: Duration::from_secs(5),
            reap: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Lobby,
    Question,
    QResult,
    Final,
}

pub enum JoinKind {
    Host,
    Player(String),
}

pub struct JoinAck {
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    SessionAlreadyStarted,
    SessionFull,
    DuplicateName,
    InvalidName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    Lobby,
    AlreadyStarted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    QuestionDeadline,
    AutoReveal,
    AutoAdvance,
}

pub enum SessionEvent {
    Join {
        kind: JoinKind,
        outbound: OutboundSender,
        reply: oneshot::Sender<Result<JoinAck, JoinError>>,
    },
    Inbound {
        role: Role,
        msg: crate::codec::ClientMessage,
    },
    ConnectionClosed {
        role: Role,
    },
    TimerFired {
        epoch: u64,
        kind: TimerKind,
    },
    Probe {
        reply: oneshot::Sender<ProbeResult>,
    },
    Reap,
}

struct Participant {
    id: String,
    display_name: String,
    score: u32,
    sender: Option<OutboundSender>,
}

struct PendingAnswer {
    selection: Selection,
    submitted: bool,
}

struct Session {
    code: String,
    quiz: Quiz,
    timings: Timings,
    limits: SessionLimits,
    directory: SharedDirectory,
    self_tx: mpsc::UnboundedSender<SessionEvent>,

    host: Option<OutboundSender>,
    participants: Vec<Participant>,
    state: SessionState,
    current_index: i32,
    answers: HashMap<String, PendingAnswer>,
    question_started_at: Option<Instant>,

    question_timer: Option<JoinHandle<()>>,
    auto_timer: Option<JoinHandle<()>>,
    epoch: u64,
}

impl Session {
    pub fn spawn(
        code: String,
        quiz: Quiz,
        timings: Timings,
        limits: SessionLimits,
        directory: SharedDirectory,
    ) -> SessionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session {
            code,
            quiz,
            timings,
            limits,
            directory,
            self_tx: tx.clone(),
            host: None,
            participants: Vec::new(),
            state: SessionState::Lobby,
            current_index: -1,
            answers: HashMap::new(),
            question_started_at: None,
            question_timer: None,
            auto_timer: None,
            epoch: 0,
        };
        tokio::spawn(session.run(rx));
        SessionHandle::new(tx)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SessionEvent>) {
        while let Some(event) = rx.recv().await {
            match event {
                SessionEvent::Reap => break,
                other => self.handle_event(other),
            }
        }
        self.cancel_all_timers();
        tracing::debug!(code = %self.code, "session actor stopped");
    }

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Join { kind, outbound, reply } => self.handle_join(kind, outbound, reply),
            SessionEvent::Inbound { role, msg } => self.handle_inbound(role, msg),
            SessionEvent::ConnectionClosed { role } => self.handle_closed(role),
            SessionEvent::TimerFired { epoch, kind } => {
                if epoch == self.epoch {
                    self.handle_timer(kind);
                }
            },
            SessionEvent::Probe { reply } => {
                let result = if self.state == SessionState::Lobby {
                    ProbeResult::Lobby
                } else {
                    ProbeResult::AlreadyStarted
                };
                let _ = reply.send(result);
            },
            SessionEvent::Reap => unreachable!("handled in run()"),
        }
    }

    fn handle_join(
        &mut self,
        kind: JoinKind,
        outbound: OutboundSender,
        reply: oneshot::Sender<Result<JoinAck, JoinError>>,
    ) {
        match kind {
            JoinKind::Host => {
                self.host = Some(outbound.clone());
                send_one(&outbound, &ServerMessage::HostJoined { pin: self.code.clone() });
                let _ = reply.send(Ok(JoinAck { role: Role::Host }));
            },
            JoinKind::Player(name) => {
                if self.state != SessionState::Lobby {
                    let _ = reply.send(Err(JoinError::SessionAlreadyStarted));
                    return;
                }
                if self.participants.len() >= self.limits.max_participants {
                    let _ = reply.send(Err(JoinError::SessionFull));
                    return;
                }
                let Some(sanitized) = sanitize_name(&name) else {
                    let _ = reply.send(Err(JoinError::InvalidName));
                    return;
                };
                if self
                    .participants
                    .iter()
                    .any(|p| p.display_name.eq_ignore_ascii_case(&sanitized))
                {
                    let _ = reply.send(Err(JoinError::DuplicateName));
                    return;
                }

                let id = uuid::Uuid::new_v4().to_string();
                self.participants.push(Participant {
                    id: id.clone(),
                    display_name: sanitized.clone(),
                    score: 0,
                    sender: Some(outbound.clone()),
                });
                send_one(
                    &outbound,
                    &ServerMessage::Joined { player_id: id.clone(), name: sanitized.clone() },
                );
                let _ = reply.send(Ok(JoinAck { role: Role::Player(id) }));
                self.send_to_host(ServerMessage::PlayerJoined {
                    name: sanitized,
                    count: self.live_participant_count(),
                });
            },
        }
    }

    fn handle_inbound(&mut self, role: Role, msg: crate::codec::ClientMessage) {
        use crate::codec::ClientMessage as C;
        match msg {
            C::HostJoin { .. } | C::PlayerJoin { .. } => {},
            C::StartGame { .. } => {
                if role != Role::Host {
                    return;
                }
                if self.state != SessionState::Lobby {
                    return;
                }
                if self.participants.is_empty() {
                    self.send_to_host(ServerMessage::Error {
                        message: "no players have joined yet".into(),
                    });
                    return;
                }
                self.start_question(0);
            },
            C::NextQuestion { .. } => {
                if role != Role::Host {
                    return;
                }
                self.next_question();
            },
            C::EndGame { .. } => {
                if role != Role::Host {
                    return;
                }
                if self.state == SessionState::Final {
                    return;
                }
                self.end_game();
            },
            C::Answer { answer, is_final, .. } => {
                let Role::Player(id) = role else { return };
                self.handle_answer(&id, answer, is_final);
            },
        }
    }

    fn handle_closed(&mut self, role: Role) {
        match role {
            Role::Host => {
                self.host = None;
                self.broadcast_to_players(ServerMessage::HostLeft {});
            },
            Role::Player(id) => {
                if let Some(p) = self.participants.iter_mut().find(|p| p.id == id) {
                    p.sender = None;
                }
                self.send_to_host(ServerMessage::PlayerLeft { count: self.live_participant_count() });

                if self.state == SessionState::Question {
                    let live = self.live_participant_count();
                    let live_submitted = self.live_submitted_count();
                    if live > 0 && live_submitted >= live {
                        self.schedule_auto_reveal();
                    }
                }
            },
        }
    }

    fn handle_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::QuestionDeadline | TimerKind::AutoReveal => self.reveal(),
            TimerKind::AutoAdvance => {
                if self.state == SessionState::QResult {
                    self.next_question();
                }
            },
        }
    }

    fn handle_answer(&mut self, pid: &str, selection: Selection, is_final: Option<bool>) {
        if self.state != SessionState::Question {
            return;
        }
        if !self.participants.iter().any(|p| p.id == pid) {
            return;
        }
        let Some(question) = self.quiz.get(self.current_index as usize).cloned() else {
            return;
        };

        let shape_ok = match question.kind {
            QuestionKind::Single => matches!(selection, Selection::Single(_)),
            QuestionKind::Multiple => matches!(selection, Selection::Multiple(_)),
        };
        if !shape_ok {
            return;
        }

        if self.answers.get(pid).is_some_and(|a| a.submitted) {
            return;
        }

        let becomes_final = match question.kind {
            QuestionKind::Single => true,
            QuestionKind::Multiple => is_final.unwrap_or(false),
        };

        let entry = self
            .answers
            .entry(pid.to_string())
            .or_insert_with(|| PendingAnswer { selection: selection.clone(), submitted: false });
        entry.selection = selection;

        if !becomes_final {
            return;
        }
        entry.submitted = true;

        let elapsed = self
            .question_started_at
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        let chosen = self.answers.get(pid).unwrap().selection.clone();
        let result = scoring::score(&question, &chosen, elapsed);

        if let Some(p) = self.participants.iter_mut().find(|p| p.id == pid) {
            p.score += result.points;
        }
        self.send_to_participant(
            pid,
            ServerMessage::AnswerReceived { correct: result.correct, points: result.points },
        );

        let submitted_count = self.answers.values().filter(|a| a.submitted).count();
        let live = self.live_participant_count();
        self.send_to_host(ServerMessage::AnswerCount { count: submitted_count, total: live });
        if live > 0 && submitted_count >= live {
            self.schedule_auto_reveal();
        }
    }

    fn start_question(&mut self, index: usize) {
        self.current_index = index as i32;
        self.state = SessionState::Question;
        self.answers.clear();
        self.question_started_at = Some(Instant::now());

        let Some(question) = self.quiz.get(index).cloned() else { return };
        let total = self.quiz.len();

        self.send_to_host(ServerMessage::Question {
            index,
            total,
            question: question.prompt.clone(),
            answers: question.choices.clone(),
            time: question.time_limit_secs,
            question_type: question.kind,
            image: question.image.clone(),
            correct: Some(correct_payload(&question.correct)),
        });
        self.broadcast_to_players(ServerMessage::Question {
            index,
            total,
            question: question.prompt.clone(),
            answers: question.choices.clone(),
            time: question.time_limit_secs,
            question_type: question.kind,
            image: question.image.clone(),
            correct: None,
        });

        self.schedule_question_deadline(Duration::from_secs(question.time_limit_secs as u64));
    }

    fn reveal(&mut self) {
        if self.state != SessionState::Question {
            self.cancel_all_timers();
            return;
        }
        self.cancel_all_timers();

        let index = self.current_index as usize;
        let Some(question) = self.quiz.get(index).cloned() else { return };

        let mut answer_counts = vec![0u32; question.choices.len()];
        for answer in self.answers.values().filter(|a| a.submitted) {
            match &answer.selection {
                Selection::Single(i) => {
                    if let Some(c) = answer_counts.get_mut(*i) {
                        *c += 1;
                    }
                },
                Selection::Multiple(set) => {
                    for i in set {
                        if let Some(c) = answer_counts.get_mut(*i) {
                            *c += 1;
                        }
                    }
                },
            }
        }

        let correct = correct_payload(&question.correct);
        let leaderboard = self.build_leaderboard();
        let is_last = index + 1 >= self.quiz.len();
        self.state = SessionState::QResult;

        self.send_to_host(ServerMessage::QuestionResult {
            correct: correct.clone(),
            leaderboard: leaderboard.clone(),
            question_type: question.kind,
            is_last,
            answer_counts: Some(answer_counts),
        });
        self.broadcast_to_players(ServerMessage::QuestionResult {
            correct,
            leaderboard,
            question_type: question.kind,
            is_last,
            answer_counts: None,
        });

        self.schedule_auto_advance();
    }

    fn next_question(&mut self) {
        if self.state != SessionState::QResult {
            return;
        }
        let next = self.current_index + 1;
        if next as usize >= self.quiz.len() {
            self.end_game();
            return;
        }
        self.start_question(next as usize);
    }

    fn end_game(&mut self) {
        self.cancel_all_timers();
        self.state = SessionState::Final;
        let leaderboard = self.build_leaderboard();
        self.send_to_host(ServerMessage::GameOver { leaderboard: leaderboard.clone() });
        self.broadcast_to_players(ServerMessage::GameOver { leaderboard });
        schedule_reap(self.code.clone(), Arc::clone(&self.directory), self.timings.reap);
    }

    fn build_leaderboard(&self) -> Vec<crate::codec::LeaderboardEntry> {
        let mut indexed: Vec<(usize, &Participant)> = self.participants.iter().enumerate().collect();
        indexed.sort_by(|a, b| b.1.score.cmp(&a.1.score).then(a.0.cmp(&b.0)));
        indexed
            .into_iter()
            .enumerate()
            .map(|(i, (_, p))| crate::codec::LeaderboardEntry {
                rank: i + 1,
                name: p.display_name.clone(),
                score: p.score,
            })
            .collect()
    }

    fn live_participant_count(&self) -> usize {
        self.participants.iter().filter(|p| p.sender.is_some()).count()
    }

    fn live_submitted_count(&self) -> usize {
        self.participants
            .iter()
            .filter(|p| p.sender.is_some())
            .filter(|p| self.answers.get(&p.id).is_some_and(|a| a.submitted))
            .count()
    }

    fn cancel_all_timers(&mut self) {
        if let Some(h) = self.question_timer.take() {
            h.abort();
        }
        if let Some(h) = self.auto_timer.take() {
            h.abort();
        }
        self.epoch += 1;
    }

    fn schedule_question_deadline(&mut self, dur: Duration) {
        self.cancel_all_timers();
        let epoch = self.epoch;
        let tx = self.self_tx.clone();
        self.question_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(dur).await;
            let _ = tx.send(SessionEvent::TimerFired { epoch, kind: TimerKind::QuestionDeadline });
        }));
    }

    fn schedule_auto_reveal(&mut self) {
        self.cancel_all_timers();
        let epoch = self.epoch;
        let tx = self.self_tx.clone();
        let dur = self.timings.auto_reveal;
        self.auto_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(dur).await;
            let _ = tx.send(SessionEvent::TimerFired { epoch, kind: TimerKind::AutoReveal });
        }));
    }

    fn schedule_auto_advance(&mut self) {
        self.cancel_all_timers();
        let epoch = self.epoch;
        let tx = self.self_tx.clone();
        let dur = self.timings.auto_advance;
        self.auto_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(dur).await;
            let _ = tx.send(SessionEvent::TimerFired { epoch, kind: TimerKind::AutoAdvance });
        }));
    }

    fn send_to_host(&self, msg: ServerMessage) {
        if let Some(sender) = &self.host {
            send_one(sender, &msg);
        }
    }

    fn send_to_participant(&self, pid: &str, msg: ServerMessage) {
        if let Some(p) = self.participants.iter().find(|p| p.id == pid) {
            if let Some(sender) = &p.sender {
                send_one(sender, &msg);
            }
        }
    }

    fn broadcast_to_players(&self, msg: ServerMessage) {
        let Ok(json) = encode_server_message(&msg) else { return };
        let payload: Arc<str> = Arc::from(json);
        for p in &self.participants {
            if let Some(sender) = &p.sender {
                let _ = sender.send(Arc::clone(&payload));
            }
        }
    }
}

fn send_one(sender: &OutboundSender, msg: &ServerMessage) {
    if let Ok(json) = encode_server_message(msg) {
        let _ = sender.send(Arc::from(json));
    }
}

fn correct_payload(correct: &CorrectAnswer) -> CorrectPayload {
    match correct {
        CorrectAnswer::Single(i) => CorrectPayload::Single(*i),
        CorrectAnswer::Multiple(set) => CorrectPayload::Multiple(set.clone()),
    }
}

/// Trim surrounding whitespace, strip angle brackets, and cap length. A
/// name that is empty after sanitizing is rejected by the caller.
fn sanitize_name(raw: &str) -> Option<String> {
    let stripped: String = raw.trim().chars().filter(|&c| c != '<' && c != '>').collect();
    let truncated: String = stripped.chars().take(MAX_NAME_LEN).collect();
    let truncated = truncated.trim().to_string();
    if truncated.is_empty() {
        None
    } else {
        Some(truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_trims_and_strips_brackets() {
        assert_eq!(sanitize_name("  <Bob>  "), Some("Bob".to_string()));
    }

    #[test]
    fn sanitize_rejects_blank_name() {
        assert_eq!(sanitize_name("   "), None);
    }

    #[test]
    fn sanitize_truncates_long_name() {
        let long = "a".repeat(40);
        assert_eq!(sanitize_name(&long).unwrap().chars().count(), MAX_NAME_LEN);
    }
}
