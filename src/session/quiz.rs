use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Minimum/maximum per-question time limit, and the default applied when a
/// question omits `time`.
pub const MIN_TIME_LIMIT_SECS: u32 = 5;
pub const MAX_TIME_LIMIT_SECS: u32 = 120;
pub const DEFAULT_TIME_LIMIT_SECS: u32 = 20;

/// Bounds on answer-choice count per question and question count per quiz.
pub const MIN_CHOICES: usize = 2;
pub const MAX_CHOICES: usize = 12;
pub const MAX_QUESTIONS: usize = 50;

/// Whether a question accepts exactly one answer or a set of answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Single,
    Multiple,
}

impl Default for QuestionKind {
    fn default() -> Self {
        Self::Single
    }
}

/// The official correctness specifier for a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrectAnswer {
    Single(usize),
    Multiple(BTreeSet<usize>),
}

/// A participant's selection, submitted or provisional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    Single(usize),
    Multiple(BTreeSet<usize>),
}

/// Raw question shape as accepted from the (already sanitized) quiz
/// definition. `time` and `kind` are optional; defaults and clamping are
/// applied by [`Quiz::new`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestion {
    pub prompt: String,
    pub choices: Vec<String>,
    pub correct: RawCorrect,
    #[serde(default)]
    pub time: Option<u32>,
    #[serde(default)]
    pub kind: Option<QuestionKind>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCorrect {
    Single(usize),
    Multiple(BTreeSet<usize>),
}

/// An immutable question record, normalized at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub prompt: String,
    pub choices: Vec<String>,
    pub correct: CorrectAnswer,
    pub time_limit_secs: u32,
    pub kind: QuestionKind,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizError {
    #[error("quiz must contain between 1 and {MAX_QUESTIONS} questions")]
    QuestionCount,
    #[error("question {0} must offer between {MIN_CHOICES} and {MAX_CHOICES} choices")]
    ChoiceCount(usize),
    #[error("question {0} correct-answer index is out of range")]
    CorrectIndexOutOfRange(usize),
    #[error("question {0} kind/correct-answer shape mismatch")]
    KindMismatch(usize),
}

impl Question {
    fn normalize(index: usize, raw: RawQuestion) -> Result<Self, QuizError> {
        if !(MIN_CHOICES..=MAX_CHOICES).contains(&raw.choices.len()) {
            return Err(QuizError::ChoiceCount(index));
        }

        let kind = raw.kind.unwrap_or_default();
        let correct = match (&kind, raw.correct) {
            (QuestionKind::Single, RawCorrect::Single(i)) => CorrectAnswer::Single(i),
            (QuestionKind::Multiple, RawCorrect::Multiple(set)) => CorrectAnswer::Multiple(set),
            // A quiz author who forgets `kind` but supplies a set/singleton is
            // still unambiguous; only a genuine shape mismatch is rejected.
            (QuestionKind::Single, RawCorrect::Multiple(set)) if set.len() == 1 => {
                CorrectAnswer::Single(*set.iter().next().unwrap())
            },
            (QuestionKind::Multiple, RawCorrect::Single(i)) => {
                CorrectAnswer::Multiple(BTreeSet::from([i]))
            },
            _ => return Err(QuizError::KindMismatch(index)),
        };

        let max_index = raw.choices.len() - 1;
        let in_range = match &correct {
            CorrectAnswer::Single(i) => *i <= max_index,
            CorrectAnswer::Multiple(set) => {
                !set.is_empty() && set.iter().all(|&i| i <= max_index)
            },
        };
        if !in_range {
            return Err(QuizError::CorrectIndexOutOfRange(index));
        }

        let time_limit_secs = raw
            .time
            .unwrap_or(DEFAULT_TIME_LIMIT_SECS)
            .clamp(MIN_TIME_LIMIT_SECS, MAX_TIME_LIMIT_SECS);

        Ok(Self {
            prompt: raw.prompt,
            choices: raw.choices,
            correct,
            time_limit_secs,
            kind,
            image: raw.image,
        })
    }
}

/// An ordered, non-empty sequence of questions. Opaque to everything except
/// the session's own scoring and reveal logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    questions: Vec<Question>,
}

impl Quiz {
    pub fn new(raw: Vec<RawQuestion>) -> Result<Self, QuizError> {
        if raw.is_empty() || raw.len() > MAX_QUESTIONS {
            return Err(QuizError::QuestionCount);
        }
        let questions = raw
            .into_iter()
            .enumerate()
            .map(|(i, q)| Question::normalize(i, q))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { questions })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_single(correct: usize) -> RawQuestion {
        RawQuestion {
            prompt: "2+2?".into(),
            choices: vec!["3".into(), "4".into(), "5".into(), "6".into()],
            correct: RawCorrect::Single(correct),
            time: None,
            kind: None,
            image: None,
        }
    }

    #[test]
    fn defaults_time_and_kind() {
        let quiz = Quiz::new(vec![raw_single(1)]).unwrap();
        let q = quiz.get(0).unwrap();
        assert_eq!(q.time_limit_secs, DEFAULT_TIME_LIMIT_SECS);
        assert_eq!(q.kind, QuestionKind::Single);
    }

    #[test]
    fn clamps_time_limit() {
        let mut raw = raw_single(1);
        raw.time = Some(500);
        let quiz = Quiz::new(vec![raw]).unwrap();
        assert_eq!(quiz.get(0).unwrap().time_limit_secs, MAX_TIME_LIMIT_SECS);

        let mut raw = raw_single(1);
        raw.time = Some(1);
        let quiz = Quiz::new(vec![raw]).unwrap();
        assert_eq!(quiz.get(0).unwrap().time_limit_secs, MIN_TIME_LIMIT_SECS);
    }

    #[test]
    fn rejects_empty_quiz() {
        assert_eq!(Quiz::new(vec![]).unwrap_err(), QuizError::QuestionCount);
    }

    #[test]
    fn rejects_too_few_choices() {
        let mut raw = raw_single(0);
        raw.choices = vec!["only one".into()];
        assert_eq!(
            Quiz::new(vec![raw]).unwrap_err(),
            QuizError::ChoiceCount(0)
        );
    }

    #[test]
    fn rejects_out_of_range_correct_index() {
        let raw = raw_single(9);
        assert_eq!(
            Quiz::new(vec![raw]).unwrap_err(),
            QuizError::CorrectIndexOutOfRange(0)
        );
    }

    #[test]
    fn multi_choice_question_normalizes() {
        let raw = RawQuestion {
            prompt: "pick all primes".into(),
            choices: vec!["2".into(), "3".into(), "4".into(), "5".into()],
            correct: RawCorrect::Multiple(BTreeSet::from([0, 1, 3])),
            time: Some(30),
            kind: Some(QuestionKind::Multiple),
            image: None,
        };
        let quiz = Quiz::new(vec![raw]).unwrap();
        let q = quiz.get(0).unwrap();
        assert_eq!(q.correct, CorrectAnswer::Multiple(BTreeSet::from([0, 1, 3])));
    }
}
