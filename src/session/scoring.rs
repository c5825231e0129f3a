//! Pure scoring function: given a question and a timed submission, compute
//! correctness and points. No side effects, no session state — this is the
//! one component the spec calls out as independently testable against the
//! scoring laws in spec.md §8.

use super::quiz::{CorrectAnswer, Question, Selection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreResult {
    pub correct: bool,
    pub points: u32,
}

const CORRECT_BASE: f64 = 500.0;
const CORRECT_TIME_BONUS: f64 = 500.0;
const PARTIAL_CREDIT_MAX: f64 = 300.0;

/// Score a submitted selection against a question's official answer.
///
/// `elapsed_secs` is the wall-clock time between question start and
/// submission; it may exceed `question.time_limit_secs` for a near-deadline
/// submission, in which case the time ratio floors at zero.
pub fn score(question: &Question, selection: &Selection, elapsed_secs: f64) -> ScoreResult {
    let limit = question.time_limit_secs as f64;
    let ratio = ((limit - elapsed_secs) / limit).max(0.0);

    match (&question.correct, selection) {
        (CorrectAnswer::Single(correct), Selection::Single(chosen)) => {
            if chosen == correct {
                ScoreResult {
                    correct: true,
                    points: round_points(CORRECT_BASE + CORRECT_TIME_BONUS * ratio),
                }
            } else {
                ScoreResult { correct: false, points: 0 }
            }
        },
        (CorrectAnswer::Multiple(correct), Selection::Multiple(chosen)) => {
            if chosen.is_empty() {
                return ScoreResult { correct: false, points: 0 };
            }
            if chosen.iter().any(|i| !correct.contains(i)) {
                return ScoreResult { correct: false, points: 0 };
            }
            if chosen == correct {
                ScoreResult {
                    correct: true,
                    points: round_points(CORRECT_BASE + CORRECT_TIME_BONUS * ratio),
                }
            } else {
                let partial = chosen.len() as f64 / correct.len() as f64;
                ScoreResult {
                    correct: false,
                    points: round_points(partial * PARTIAL_CREDIT_MAX),
                }
            }
        },
        // A selection whose shape doesn't match the question's kind can't
        // arise through the codec (the session only builds a `Selection`
        // that matches `question.kind`), but treat it as wrong rather than
        // panicking.
        _ => ScoreResult { correct: false, points: 0 },
    }
}

fn round_points(x: f64) -> u32 {
    x.round().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::session::quiz::{QuestionKind, RawCorrect, RawQuestion};

    fn single_choice_question(time: u32) -> Question {
        let raw = RawQuestion {
            prompt: "2+2?".into(),
            choices: vec!["3".into(), "4".into(), "5".into(), "6".into()],
            correct: RawCorrect::Single(1),
            time: Some(time),
            kind: None,
            image: None,
        };
        crate::session::quiz::Quiz::new(vec![raw]).unwrap().get(0).unwrap().clone()
    }

    fn multi_choice_question(time: u32) -> Question {
        let raw = RawQuestion {
            prompt: "pick primes".into(),
            choices: vec!["2".into(), "3".into(), "4".into(), "5".into()],
            correct: RawCorrect::Multiple(BTreeSet::from([0, 1, 3])),
            time: Some(time),
            kind: Some(QuestionKind::Multiple),
            image: None,
        };
        crate::session::quiz::Quiz::new(vec![raw]).unwrap().get(0).unwrap().clone()
    }

    #[test]
    fn single_choice_instant_correct_gets_full_bonus() {
        let q = single_choice_question(20);
        let r = score(&q, &Selection::Single(1), 0.0);
        assert!(r.correct);
        assert_eq!(r.points, 1000);
    }

    #[test]
    fn single_choice_half_time_bonus() {
        let q = single_choice_question(20);
        let r = score(&q, &Selection::Single(1), 10.0);
        assert!(r.correct);
        assert_eq!(r.points, 750);
    }

    #[test]
    fn single_choice_incorrect_scores_zero() {
        let q = single_choice_question(20);
        let r = score(&q, &Selection::Single(0), 0.0);
        assert!(!r.correct);
        assert_eq!(r.points, 0);
    }

    #[test]
    fn single_choice_past_deadline_floors_ratio_at_zero() {
        let q = single_choice_question(20);
        let r = score(&q, &Selection::Single(1), 45.0);
        assert!(r.correct);
        assert_eq!(r.points, 500);
    }

    #[test]
    fn multi_choice_partial_credit() {
        let q = multi_choice_question(20);
        let sel = Selection::Multiple(BTreeSet::from([0, 1]));
        let r = score(&q, &sel, 0.0);
        assert!(!r.correct);
        assert_eq!(r.points, 200);
    }

    #[test]
    fn multi_choice_perfect_at_deadline_scores_base_only() {
        let q = multi_choice_question(20);
        let sel = Selection::Multiple(BTreeSet::from([0, 1, 3]));
        let r = score(&q, &sel, 20.0);
        assert!(r.correct);
        assert_eq!(r.points, 500);
    }

    #[test]
    fn multi_choice_wrong_selection_scores_zero() {
        let q = multi_choice_question(20);
        let sel = Selection::Multiple(BTreeSet::from([0, 2]));
        let r = score(&q, &sel, 0.0);
        assert!(!r.correct);
        assert_eq!(r.points, 0);
    }

    #[test]
    fn multi_choice_empty_selection_scores_zero() {
        let q = multi_choice_question(20);
        let sel = Selection::Multiple(BTreeSet::new());
        let r = score(&q, &sel, 0.0);
        assert!(!r.correct);
        assert_eq!(r.points, 0);
    }

    #[test]
    fn perfect_multi_choice_matches_single_choice_formula_at_same_elapsed() {
        let multi = multi_choice_question(20);
        let single = single_choice_question(20);
        let multi_r = score(&multi, &Selection::Multiple(BTreeSet::from([0, 1, 3])), 8.0);
        let single_r = score(&single, &Selection::Single(1), 8.0);
        assert_eq!(multi_r.points, single_r.points);
    }

    #[test]
    fn scoring_is_monotonic_in_elapsed_time() {
        let q = single_choice_question(20);
        let early = score(&q, &Selection::Single(1), 2.0);
        let late = score(&q, &Selection::Single(1), 15.0);
        assert!(early.points >= late.points);
    }
}
