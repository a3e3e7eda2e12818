use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::WordId;

/// Words carry one or two example sentences.
pub const MAX_SENTENCES: usize = 2;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WordError {
    #[error("word text cannot be empty")]
    EmptyText,

    #[error("definition cannot be empty")]
    EmptyDefinition,

    #[error("a word needs at least one example sentence")]
    NoSentences,

    #[error("a word has at most {MAX_SENTENCES} example sentences, got {len}")]
    TooManySentences { len: usize },

    #[error("starting letter {letter:?} does not match word {text:?}")]
    StartingLetterMismatch { letter: char, text: String },

    #[error("unknown part of speech: {0}")]
    UnknownPartOfSpeech(String),

    #[error("unknown complexity: {0}")]
    UnknownComplexity(String),
}

//
// ─── COMPLEXITY ────────────────────────────────────────────────────────────────
//

/// Coarse difficulty tag attached to every corpus word.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    #[default]
    Medium,
    High,
}

impl Complexity {
    pub const ALL: [Complexity; 3] = [Complexity::Simple, Complexity::Medium, Complexity::High];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        }
    }

    /// Lenient parse for spreadsheet-style labels ("Easy", "difficult", "2", ...).
    ///
    /// Returns `None` when nothing recognisable is found.
    #[must_use]
    pub fn from_label(raw: &str) -> Option<Self> {
        let label = raw.trim().to_lowercase();
        if label.is_empty() {
            return None;
        }
        let has = |needle: &str| label.contains(needle);
        if has("simple") || has("easy") || has("low") || label == "1" {
            Some(Complexity::Simple)
        } else if has("medium") || has("moderate") || label == "2" {
            Some(Complexity::Medium)
        } else if has("high") || has("hard") || has("difficult") || has("complex") || label == "3"
        {
            Some(Complexity::High)
        } else {
            None
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact tag match; filters never use the lenient label parser.
impl FromStr for Complexity {
    type Err = WordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(Complexity::Simple),
            "medium" => Ok(Complexity::Medium),
            "high" => Ok(Complexity::High),
            other => Err(WordError::UnknownComplexity(other.to_string())),
        }
    }
}

//
// ─── PART OF SPEECH ────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartOfSpeech {
    Noun,
    Verb,
    Adjective,
    Adverb,
    Preposition,
    Conjunction,
    Interjection,
    Pronoun,
}

impl PartOfSpeech {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PartOfSpeech::Noun => "noun",
            PartOfSpeech::Verb => "verb",
            PartOfSpeech::Adjective => "adjective",
            PartOfSpeech::Adverb => "adverb",
            PartOfSpeech::Preposition => "preposition",
            PartOfSpeech::Conjunction => "conjunction",
            PartOfSpeech::Interjection => "interjection",
            PartOfSpeech::Pronoun => "pronoun",
        }
    }
}

impl fmt::Display for PartOfSpeech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartOfSpeech {
    type Err = WordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "noun" => Ok(PartOfSpeech::Noun),
            "verb" => Ok(PartOfSpeech::Verb),
            "adjective" => Ok(PartOfSpeech::Adjective),
            "adverb" => Ok(PartOfSpeech::Adverb),
            "preposition" => Ok(PartOfSpeech::Preposition),
            "conjunction" => Ok(PartOfSpeech::Conjunction),
            "interjection" => Ok(PartOfSpeech::Interjection),
            "pronoun" => Ok(PartOfSpeech::Pronoun),
            _ => Err(WordError::UnknownPartOfSpeech(s.to_string())),
        }
    }
}

//
// ─── LETTERS ───────────────────────────────────────────────────────────────────
//

/// Upper-cases a letter so filters compare case-insensitively.
#[must_use]
pub fn normalize_letter(letter: char) -> char {
    letter.to_uppercase().next().unwrap_or(letter)
}

/// First character of `text`, upper-cased.
#[must_use]
pub fn starting_letter_of(text: &str) -> Option<char> {
    text.trim().chars().next().map(normalize_letter)
}

//
// ─── WORD ──────────────────────────────────────────────────────────────────────
//

/// Immutable corpus entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    id: WordId,
    text: String,
    definition: String,
    part_of_speech: PartOfSpeech,
    sentences: Vec<String>,
    starting_letter: char,
    complexity: Complexity,
}

impl Word {
    /// Build a validated word. The starting letter is derived from the text.
    ///
    /// # Errors
    ///
    /// Returns `WordError` when text or definition are blank or the sentence
    /// count falls outside `1..=MAX_SENTENCES`.
    pub fn new(
        id: WordId,
        text: impl Into<String>,
        definition: impl Into<String>,
        part_of_speech: PartOfSpeech,
        sentences: Vec<String>,
        complexity: Complexity,
    ) -> Result<Self, WordError> {
        let text = text.into();
        let letter = starting_letter_of(&text).ok_or(WordError::EmptyText)?;
        Self::from_persisted(
            id,
            text,
            definition.into(),
            part_of_speech,
            sentences,
            letter,
            complexity,
        )
    }

    /// Rehydrate a word whose starting letter was stored alongside it.
    ///
    /// # Errors
    ///
    /// Same rules as [`Word::new`], and the stored letter must match the text.
    pub fn from_persisted(
        id: WordId,
        text: String,
        definition: String,
        part_of_speech: PartOfSpeech,
        sentences: Vec<String>,
        starting_letter: char,
        complexity: Complexity,
    ) -> Result<Self, WordError> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(WordError::EmptyText);
        }
        let definition = definition.trim().to_string();
        if definition.is_empty() {
            return Err(WordError::EmptyDefinition);
        }

        let sentences: Vec<String> = sentences
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if sentences.is_empty() {
            return Err(WordError::NoSentences);
        }
        if sentences.len() > MAX_SENTENCES {
            return Err(WordError::TooManySentences {
                len: sentences.len(),
            });
        }

        let starting_letter = normalize_letter(starting_letter);
        if starting_letter_of(&text) != Some(starting_letter) {
            return Err(WordError::StartingLetterMismatch {
                letter: starting_letter,
                text,
            });
        }

        Ok(Self {
            id,
            text,
            definition,
            part_of_speech,
            sentences,
            starting_letter,
            complexity,
        })
    }

    #[must_use]
    pub fn id(&self) -> WordId {
        self.id
    }

    /// Same word under another id; used when the store resolves ids by text.
    #[must_use]
    pub fn with_id(mut self, id: WordId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn definition(&self) -> &str {
        &self.definition
    }

    #[must_use]
    pub fn part_of_speech(&self) -> PartOfSpeech {
        self.part_of_speech
    }

    #[must_use]
    pub fn sentences(&self) -> &[String] {
        &self.sentences
    }

    #[must_use]
    pub fn starting_letter(&self) -> char {
        self.starting_letter
    }

    #[must_use]
    pub fn complexity(&self) -> Complexity {
        self.complexity
    }

    /// True when the word passes both optional filters.
    ///
    /// Letters compare case-insensitively; complexity must match exactly.
    #[must_use]
    pub fn matches(&self, letter: Option<char>, complexity: Option<Complexity>) -> bool {
        letter.is_none_or(|l| normalize_letter(l) == self.starting_letter)
            && complexity.is_none_or(|c| c == self.complexity)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
