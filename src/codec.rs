//! Wire protocol: JSON text frames with a `type` discriminator, as specified
//! by the host/player duplex channel. Unlike the teacher's binary MessagePack
//! protocol, the spec calls for JSON explicitly (spec.md §4.2, §6) — this is
//! the one deliberate deviation from the teacher's wire format, noted in
//! DESIGN.md.

use serde::{Deserialize, Serialize};

use crate::session::quiz::{QuestionKind, Selection};

/// Inbound frames larger than this are rejected with an error reply; the
/// frame itself is never parsed.
pub const MAX_FRAME_BYTES: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    Oversized,
    Malformed,
    InvalidPin,
}

/// Messages a client may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    HostJoin {
        pin: String,
    },
    PlayerJoin {
        pin: String,
        name: String,
    },
    StartGame {
        pin: String,
    },
    NextQuestion {
        pin: String,
    },
    EndGame {
        pin: String,
    },
    Answer {
        pin: String,
        answer: Selection,
        #[serde(default, rename = "final")]
        is_final: Option<bool>,
    },
}

impl ClientMessage {
    fn pin(&self) -> &str {
        match self {
            Self::HostJoin { pin }
            | Self::PlayerJoin { pin, .. }
            | Self::StartGame { pin }
            | Self::NextQuestion { pin }
            | Self::EndGame { pin }
            | Self::Answer { pin, .. } => pin,
        }
    }
}

/// Messages the server may send. `Deserialize` is derived too even though
/// production code never parses its own output back — it lets integration
/// tests assert on a typed value instead of poking at raw JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Error {
        message: String,
    },
    HostJoined {
        pin: String,
    },
    Joined {
        #[serde(rename = "playerId")]
        player_id: String,
        name: String,
    },
    PlayerJoined {
        name: String,
        count: usize,
    },
    PlayerLeft {
        count: usize,
    },
    HostLeft {},
    Question {
        index: usize,
        total: usize,
        question: String,
        answers: Vec<String>,
        time: u32,
        #[serde(rename = "questionType")]
        question_type: QuestionKind,
        image: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        correct: Option<CorrectPayload>,
    },
    AnswerReceived {
        correct: bool,
        points: u32,
    },
    AnswerCount {
        count: usize,
        total: usize,
    },
    QuestionResult {
        correct: CorrectPayload,
        leaderboard: Vec<LeaderboardEntry>,
        #[serde(rename = "questionType")]
        question_type: QuestionKind,
        #[serde(rename = "isLast")]
        is_last: bool,
        #[serde(rename = "answerCounts", skip_serializing_if = "Option::is_none")]
        answer_counts: Option<Vec<u32>>,
    },
    GameOver {
        leaderboard: Vec<LeaderboardEntry>,
    },
}

/// The official answer, serialized either as a single index or a set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrectPayload {
    Single(usize),
    Multiple(std::collections::BTreeSet<usize>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub name: String,
    pub score: u32,
}

/// A 6-digit numeric pin, exactly as the regex in spec.md §4.2 requires.
pub fn is_valid_pin(pin: &str) -> bool {
    pin.len() == 6 && pin.bytes().all(|b| b.is_ascii_digit())
}

/// Decode an inbound client frame, enforcing the size ceiling and pin format
/// before attempting to parse JSON. Oversized frames are reported distinctly
/// so the caller can reply with an `error` message (spec.md §7); any other
/// decode failure is silently dropped.
pub fn decode_client_message(raw: &str) -> Result<ClientMessage, CodecError> {
    if raw.len() > MAX_FRAME_BYTES {
        return Err(CodecError::Oversized);
    }
    let msg: ClientMessage = serde_json::from_str(raw).map_err(|_| CodecError::Malformed)?;
    if !is_valid_pin(msg.pin()) {
        return Err(CodecError::InvalidPin);
    }
    Ok(msg)
}

/// Encode an outbound server message. Serialization cannot fail for any
/// variant this module defines; the `Result` exists so a future payload
/// (e.g. a non-finite float) degrades gracefully instead of panicking.
pub fn encode_server_message(msg: &ServerMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_pin_accepted() {
        assert!(is_valid_pin("123456"));
    }

    #[test]
    fn short_pin_rejected() {
        assert!(!is_valid_pin("12345"));
    }

    #[test]
    fn non_digit_pin_rejected() {
        assert!(!is_valid_pin("12345a"));
    }

    #[test]
    fn decodes_host_join() {
        let msg = decode_client_message(r#"{"type":"host_join","pin":"123456"}"#).unwrap();
        matches!(msg, ClientMessage::HostJoin { .. });
    }

    #[test]
    fn rejects_oversized_frame() {
        let huge = format!(
            r#"{{"type":"player_join","pin":"123456","name":"{}"}}"#,
            "a".repeat(MAX_FRAME_BYTES)
        );
        assert_eq!(
            decode_client_message(&huge).unwrap_err(),
            CodecError::Oversized
        );
    }

    #[test]
    fn rejects_malformed_json() {
        assert_eq!(
            decode_client_message("not json").unwrap_err(),
            CodecError::Malformed
        );
    }

    #[test]
    fn rejects_bad_pin() {
        let msg = r#"{"type":"host_join","pin":"12ab56"}"#;
        assert_eq!(
            decode_client_message(msg).unwrap_err(),
            CodecError::InvalidPin
        );
    }

    #[test]
    fn decodes_multi_select_answer() {
        let msg = decode_client_message(
            r#"{"type":"answer","pin":"123456","answer":[0,1,2],"final":true}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::Answer { answer, is_final, .. } => {
                assert_eq!(answer, Selection::Multiple(std::collections::BTreeSet::from([0, 1, 2])));
                assert_eq!(is_final, Some(true));
            },
            other => panic!("expected Answer, got {other:?}"),
        }
    }

    #[test]
    fn encodes_question_with_correct_for_host_variant() {
        let msg = ServerMessage::Question {
            index: 0,
            total: 1,
            question: "2+2?".into(),
            answers: vec!["3".into(), "4".into()],
            time: 20,
            question_type: QuestionKind::Single,
            image: None,
            correct: Some(CorrectPayload::Single(1)),
        };
        let json = encode_server_message(&msg).unwrap();
        assert!(json.contains("\"correct\":1"));
    }

    #[test]
    fn encodes_question_without_correct_for_player_variant() {
        let msg = ServerMessage::Question {
            index: 0,
            total: 1,
            question: "2+2?".into(),
            answers: vec!["3".into(), "4".into()],
            time: 20,
            question_type: QuestionKind::Single,
            image: None,
            correct: None,
        };
        let json = encode_server_message(&msg).unwrap();
        assert!(!json.contains("correct"));
    }
}
