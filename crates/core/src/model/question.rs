use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::WordId;
use crate::model::word::{PartOfSpeech, Word};

/// Number of options on every multiple-choice question.
pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("option {0:?} appears more than once")]
    DuplicateOption(String),

    #[error("options do not contain the correct answer {0:?}")]
    MissingCorrectAnswer(String),
}

/// A multiple-choice question derived from a session entry. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub word_id: WordId,
    pub definition: String,
    pub part_of_speech: PartOfSpeech,
    pub options: [String; OPTIONS_PER_QUESTION],
    pub correct_answer: String,
}

impl Question {
    /// Build a question for `word` with options in the given order.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if options repeat or the word's text is absent.
    pub fn new(word: &Word, options: [String; OPTIONS_PER_QUESTION]) -> Result<Self, QuestionError> {
        let mut seen = HashSet::with_capacity(OPTIONS_PER_QUESTION);
        for option in &options {
            if !seen.insert(option.as_str()) {
                return Err(QuestionError::DuplicateOption(option.clone()));
            }
        }
        if !seen.contains(word.text()) {
            return Err(QuestionError::MissingCorrectAnswer(word.text().to_string()));
        }

        Ok(Self {
            word_id: word.id(),
            definition: word.definition().to_string(),
            part_of_speech: word.part_of_speech(),
            options,
            correct_answer: word.text().to_string(),
        })
    }

    /// Position of the correct answer among the options.
    #[must_use]
    pub fn correct_index(&self) -> Option<usize> {
        self.options.iter().position(|o| *o == self.correct_answer)
    }
}
