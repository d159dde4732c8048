//! Question presentation and answer submission rules.
//!
//! Sits between the raw `new_question` payload and the session: prepares
//! the question for display (shuffling options so every client sees its
//! own order), enforces the one-answer-per-question rule, and knows how
//! long the judgement stays on screen per game mode.

use std::time::Duration;

use rand::seq::SliceRandom;

use crate::protocol::{AnswerResultPayload, Coordinates, GameMode, QuestionPayload};

/// How long the judgement for a multiple choice question stays visible
/// before the next question is requested.
pub const MCQ_REVEAL_DELAY: Duration = Duration::from_millis(2000);

/// Map questions get longer, so the player can see where the country
/// actually is.
pub const MAP_REVEAL_DELAY: Duration = Duration::from_millis(4000);

/// The interactive part of a question, by game mode.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionPrompt {
    /// Candidate country names, already shuffled for display.
    MultipleChoice { options: Vec<String> },
    /// The player picks a spot on the world map.
    MapPick { coordinates: Option<Coordinates> },
}

/// A question as presented to the player.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveQuestion {
    /// Zero-based position in the room's question sequence.
    pub index: u32,
    /// URL of the flag image to display.
    pub flag_url: String,
    pub prompt: QuestionPrompt,
    /// The correct country name, kept for marking the reveal.
    pub correct_answer: String,
}

/// Builds the displayable question for one payload.
///
/// Multiple choice options arrive in server order; they are shuffled
/// here so option position carries no information.
pub fn prepare_question(mode: GameMode, index: u32, payload: QuestionPayload) -> ActiveQuestion {
    let prompt = match mode {
        GameMode::Mcq => {
            let mut options = payload.options;
            options.shuffle(&mut rand::thread_rng());
            QuestionPrompt::MultipleChoice { options }
        }
        GameMode::Map => QuestionPrompt::MapPick {
            coordinates: payload.coordinates,
        },
    };
    ActiveQuestion {
        index,
        flag_url: payload.flag_url,
        prompt,
        correct_answer: payload.answer,
    }
}

/// How long the reveal stays on screen for the given mode.
pub fn reveal_delay(mode: GameMode) -> Duration {
    match mode {
        GameMode::Mcq => MCQ_REVEAL_DELAY,
        GameMode::Map => MAP_REVEAL_DELAY,
    }
}

/// Whether the server judged the submitted answer correct.
pub fn is_correct(result: &AnswerResultPayload) -> bool {
    result.correct_answer == result.chosen_answer
}

/// One-answer-per-question guard.
///
/// Armed when a question is presented, consumed by the first submission.
/// Further submissions for the same question are refused.
#[derive(Debug, Clone, Default)]
pub struct AnswerFlow {
    submitted: bool,
}

impl AnswerFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-arms the guard for a fresh question.
    pub fn reset(&mut self) {
        self.submitted = false;
    }

    /// Claims the single submission slot. Returns `false` if an answer
    /// for the current question was already sent.
    pub fn try_submit(&mut self) -> bool {
        if self.submitted {
            return false;
        }
        self.submitted = true;
        true
    }

    pub fn has_submitted(&self) -> bool {
        self.submitted
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    fn mcq_payload() -> QuestionPayload {
        QuestionPayload {
            index: Some(0),
            flag_url: "https://flagcdn.com/w320/fr.png".to_string(),
            options: vec![
                "France".to_string(),
                "Italy".to_string(),
                "Spain".to_string(),
                "Belgium".to_string(),
            ],
            answer: "France".to_string(),
            coordinates: None,
        }
    }

    #[test]
    fn prepare_keeps_the_option_set() {
        let question = prepare_question(GameMode::Mcq, 0, mcq_payload());
        let QuestionPrompt::MultipleChoice { options } = question.prompt else {
            panic!("expected multiple choice prompt");
        };
        let mut sorted = options.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["Belgium", "France", "Italy", "Spain"]);
        assert_eq!(question.correct_answer, "France");
        assert!(options.contains(&question.correct_answer));
    }

    #[test]
    fn prepare_map_question_carries_coordinates() {
        let payload = QuestionPayload {
            index: Some(2),
            flag_url: "https://flagcdn.com/w320/jp.png".to_string(),
            options: Vec::new(),
            answer: "Japan".to_string(),
            coordinates: Some(Coordinates {
                lon: 138.25,
                lat: 36.2,
            }),
        };
        let question = prepare_question(GameMode::Map, 2, payload);
        assert_eq!(
            question.prompt,
            QuestionPrompt::MapPick {
                coordinates: Some(Coordinates {
                    lon: 138.25,
                    lat: 36.2,
                })
            }
        );
    }

    #[test]
    fn reveal_delay_depends_on_mode() {
        assert_eq!(reveal_delay(GameMode::Mcq), Duration::from_millis(2000));
        assert_eq!(reveal_delay(GameMode::Map), Duration::from_millis(4000));
    }

    #[test]
    fn answer_flow_is_one_shot() {
        let mut flow = AnswerFlow::new();
        assert!(flow.try_submit());
        assert!(!flow.try_submit());
        assert!(flow.has_submitted());

        flow.reset();
        assert!(!flow.has_submitted());
        assert!(flow.try_submit());
    }

    #[test]
    fn judgement_compares_answers() {
        let correct = AnswerResultPayload {
            correct_answer: "France".to_string(),
            chosen_answer: "France".to_string(),
        };
        let wrong = AnswerResultPayload {
            correct_answer: "France".to_string(),
            chosen_answer: "Spain".to_string(),
        };
        assert!(is_correct(&correct));
        assert!(!is_correct(&wrong));
    }
}
