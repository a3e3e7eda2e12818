use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{SessionId, UserId, WordId};
use crate::model::word::{Complexity, Word, normalize_letter};

/// Every question shows this many options, so a quiz needs at least this many words.
pub const MIN_QUIZ_WORDS: usize = 4;

/// Shown in review lists for questions the learner skipped.
pub const NO_ANSWER: &str = "No answer";

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoreError {
    #[error("cannot score a quiz without questions")]
    NoQuestions,

    #[error("correct answers ({correct}) exceed question count ({total})")]
    CorrectExceedsTotal { correct: u32, total: u32 },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizSessionError {
    #[error("requested word count must be positive")]
    InvalidRequestedCount,

    #[error("need at least {MIN_QUIZ_WORDS} words for quiz options, found {available}")]
    TooFewWords { available: usize },

    #[error("quiz session already completed")]
    AlreadyCompleted,

    #[error("graded result belongs to a different session")]
    SessionMismatch,

    #[error("completed session is missing its score")]
    MissingScore,

    #[error("session has {len} entries, too many to score")]
    TooManyEntries { len: usize },

    #[error(transparent)]
    Score(#[from] ScoreError),
}

//
// ─── MODE ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizMode {
    #[default]
    Quiz,
    Flashcard,
}

impl QuizMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuizMode::Quiz => "quiz",
            QuizMode::Flashcard => "flashcard",
        }
    }
}

impl fmt::Display for QuizMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuizMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quiz" => Ok(QuizMode::Quiz),
            "flashcard" => Ok(QuizMode::Flashcard),
            other => Err(format!("unknown quiz mode: {other}")),
        }
    }
}

//
// ─── SCORE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizScore {
    pub correct: u32,
    pub incorrect: u32,
    pub percentage: u32,
}

impl QuizScore {
    /// Score `correct` answers out of `total` questions.
    ///
    /// The percentage rounds half up, so 1 of 8 gives 13.
    ///
    /// # Errors
    ///
    /// Returns `ScoreError` if `total` is zero or smaller than `correct`.
    pub fn tally(correct: u32, total: u32) -> Result<Self, ScoreError> {
        if total == 0 {
            return Err(ScoreError::NoQuestions);
        }
        if correct > total {
            return Err(ScoreError::CorrectExceedsTotal { correct, total });
        }
        let percentage = (u64::from(correct) * 200 + u64::from(total)) / (2 * u64::from(total));
        Ok(Self {
            correct,
            incorrect: total - correct,
            // bounded by 100
            percentage: u32::try_from(percentage).unwrap_or(100),
        })
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.correct + self.incorrect
    }
}

//
// ─── SESSION ENTRY ─────────────────────────────────────────────────────────────
//

/// One quizzed word, snapshotted at selection time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub word_id: WordId,
    pub word: Word,
    pub user_answer: Option<String>,
    pub is_correct: Option<bool>,
}

impl SessionEntry {
    #[must_use]
    pub fn snapshot(word: &Word) -> Self {
        Self {
            word_id: word.id(),
            word: word.clone(),
            user_answer: None,
            is_correct: None,
        }
    }

    /// The learner's answer, or [`NO_ANSWER`].
    #[must_use]
    pub fn answer_or_sentinel(&self) -> &str {
        self.user_answer.as_deref().unwrap_or(NO_ANSWER)
    }
}

//
// ─── GRADED QUIZ ───────────────────────────────────────────────────────────────
//

/// Outcome of grading a session, ready to be committed to storage.
///
/// Grading is pure: the session is untouched until the store applies this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedQuiz {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub entries: Vec<SessionEntry>,
    pub score: QuizScore,
    pub completed_at: DateTime<Utc>,
}

impl GradedQuiz {
    #[must_use]
    pub fn word_count(&self) -> u32 {
        self.score.total()
    }
}

//
// ─── QUIZ SESSION ──────────────────────────────────────────────────────────────
//

/// Optional filters a quiz was started with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordFilter {
    pub letter: Option<char>,
    pub complexity: Option<Complexity>,
}

impl WordFilter {
    #[must_use]
    pub fn new(letter: Option<char>, complexity: Option<Complexity>) -> Self {
        Self {
            letter: letter.map(normalize_letter),
            complexity,
        }
    }

    #[must_use]
    pub fn matches(&self, word: &Word) -> bool {
        word.matches(self.letter, self.complexity)
    }
}

/// One quiz attempt, from start through optional completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSession {
    id: SessionId,
    user_id: UserId,
    mode: QuizMode,
    requested_word_count: u32,
    filter: WordFilter,
    entries: Vec<SessionEntry>,
    score: Option<QuizScore>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl QuizSession {
    /// Start a session over the already-selected `words`.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidRequestedCount` for a zero request and
    /// `QuizSessionError::TooFewWords` when fewer than [`MIN_QUIZ_WORDS`] words
    /// were selected.
    pub fn start(
        id: SessionId,
        user_id: UserId,
        mode: QuizMode,
        requested_word_count: u32,
        filter: WordFilter,
        words: &[Word],
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuizSessionError> {
        if requested_word_count == 0 {
            return Err(QuizSessionError::InvalidRequestedCount);
        }
        if words.len() < MIN_QUIZ_WORDS {
            return Err(QuizSessionError::TooFewWords {
                available: words.len(),
            });
        }

        Ok(Self {
            id,
            user_id,
            mode,
            requested_word_count,
            filter: WordFilter::new(filter.letter, filter.complexity),
            entries: words.iter().map(SessionEntry::snapshot).collect(),
            score: None,
            created_at,
            completed_at: None,
        })
    }

    /// Rehydrate a session from storage.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::TooFewWords` if the entry list is too short and
    /// `QuizSessionError::MissingScore` for a completed session without a score.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: SessionId,
        user_id: UserId,
        mode: QuizMode,
        requested_word_count: u32,
        filter: WordFilter,
        entries: Vec<SessionEntry>,
        score: Option<QuizScore>,
        created_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, QuizSessionError> {
        if entries.len() < MIN_QUIZ_WORDS {
            return Err(QuizSessionError::TooFewWords {
                available: entries.len(),
            });
        }
        if completed_at.is_some() && score.is_none() {
            return Err(QuizSessionError::MissingScore);
        }
        Ok(Self {
            id,
            user_id,
            mode,
            requested_word_count,
            filter,
            entries,
            score,
            created_at,
            completed_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn mode(&self) -> QuizMode {
        self.mode
    }

    #[must_use]
    pub fn requested_word_count(&self) -> u32 {
        self.requested_word_count
    }

    #[must_use]
    pub fn filter(&self) -> WordFilter {
        self.filter
    }

    #[must_use]
    pub fn letter_filter(&self) -> Option<char> {
        self.filter.letter
    }

    #[must_use]
    pub fn complexity_filter(&self) -> Option<Complexity> {
        self.filter.complexity
    }

    #[must_use]
    pub fn entries(&self) -> &[SessionEntry] {
        &self.entries
    }

    #[must_use]
    pub fn word_count(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn score(&self) -> Option<QuizScore> {
        self.score
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Judge every entry against `answers` (exact text match).
    ///
    /// Missing or blank answers count as incorrect. Entries keep their order.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::AlreadyCompleted` if the session was graded before.
    pub fn grade(
        &self,
        answers: &HashMap<WordId, String>,
        completed_at: DateTime<Utc>,
    ) -> Result<GradedQuiz, QuizSessionError> {
        if self.is_completed() {
            return Err(QuizSessionError::AlreadyCompleted);
        }

        let mut correct = 0_u32;
        let entries: Vec<SessionEntry> = self
            .entries
            .iter()
            .map(|entry| {
                let user_answer = answers
                    .get(&entry.word_id)
                    .filter(|answer| !answer.is_empty())
                    .cloned();
                let is_correct = user_answer.as_deref() == Some(entry.word.text());
                if is_correct {
                    correct += 1;
                }
                SessionEntry {
                    user_answer,
                    is_correct: Some(is_correct),
                    ..entry.clone()
                }
            })
            .collect();

        let total = u32::try_from(entries.len()).map_err(|_| QuizSessionError::TooManyEntries {
            len: entries.len(),
        })?;
        let score = QuizScore::tally(correct, total)?;

        Ok(GradedQuiz {
            session_id: self.id,
            user_id: self.user_id,
            entries,
            score,
            completed_at,
        })
    }

    /// Commit a grading result. Applied at most once.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::AlreadyCompleted` if already completed, or
    /// `QuizSessionError::SessionMismatch` if `graded` came from another session.
    pub fn complete(&mut self, graded: &GradedQuiz) -> Result<(), QuizSessionError> {
        if graded.session_id != self.id {
            return Err(QuizSessionError::SessionMismatch);
        }
        if self.is_completed() {
            return Err(QuizSessionError::AlreadyCompleted);
        }
        self.entries.clone_from(&graded.entries);
        self.score = Some(graded.score);
        self.completed_at = Some(graded.completed_at);
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::word::PartOfSpeech;
    use crate::time::fixed_now;

    fn word(id: u64, text: &str) -> Word {
        Word::new(
            WordId::new(id),
            text,
            format!("definition of {text}"),
            PartOfSpeech::Noun,
            vec![format!("A sentence with {text}.")],
            Complexity::Medium,
        )
        .unwrap()
    }

    fn five_words() -> Vec<Word> {
        ["abate", "bolster", "cogent", "dearth", "eschew"]
            .iter()
            .enumerate()
            .map(|(i, t)| word(i as u64 + 1, t))
            .collect()
    }

    fn start(words: &[Word]) -> QuizSession {
        QuizSession::start(
            SessionId::generate(),
            UserId::LOCAL,
            QuizMode::Quiz,
            10,
            WordFilter::new(Some('q'), None),
            words,
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn tally_rounds_half_up() {
        assert_eq!(QuizScore::tally(3, 5).unwrap().percentage, 60);
        assert_eq!(QuizScore::tally(1, 8).unwrap().percentage, 13);
        assert_eq!(QuizScore::tally(2, 3).unwrap().percentage, 67);
        assert_eq!(QuizScore::tally(0, 4).unwrap().percentage, 0);
        assert_eq!(QuizScore::tally(4, 4).unwrap().percentage, 100);
        assert_eq!(QuizScore::tally(0, 0).unwrap_err(), ScoreError::NoQuestions);
    }

    #[test]
    fn start_requires_minimum_words() {
        let words = five_words();
        let err = QuizSession::start(
            SessionId::generate(),
            UserId::LOCAL,
            QuizMode::Quiz,
            10,
            WordFilter::default(),
            &words[..3],
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, QuizSessionError::TooFewWords { available: 3 });
    }

    #[test]
    fn start_upper_cases_letter_filter() {
        let session = start(&five_words());
        assert_eq!(session.letter_filter(), Some('Q'));
        assert!(!session.is_completed());
        assert_eq!(session.word_count(), 5);
    }

    #[test]
    fn grade_counts_missing_answers_as_incorrect() {
        let words = five_words();
        let session = start(&words);

        let mut answers = HashMap::new();
        answers.insert(words[0].id(), "abate".to_string());
        answers.insert(words[1].id(), "bolster".to_string());
        answers.insert(words[2].id(), "cogent".to_string());
        answers.insert(words[3].id(), "eschew".to_string());

        let graded = session.grade(&answers, fixed_now()).unwrap();
        assert_eq!(
            graded.score,
            QuizScore {
                correct: 3,
                incorrect: 2,
                percentage: 60
            }
        );
        assert_eq!(graded.entries[3].is_correct, Some(false));
        assert_eq!(graded.entries[4].user_answer, None);
        assert_eq!(graded.entries[4].answer_or_sentinel(), NO_ANSWER);
        // grading does not mutate the session
        assert!(!session.is_completed());
    }

    #[test]
    fn grading_is_exact_match() {
        let words = five_words();
        let session = start(&words);
        let mut answers = HashMap::new();
        answers.insert(words[0].id(), "Abate".to_string());
        answers.insert(words[1].id(), String::new());

        let graded = session.grade(&answers, fixed_now()).unwrap();
        assert_eq!(graded.entries[0].is_correct, Some(false));
        assert_eq!(graded.entries[1].user_answer, None);
        assert_eq!(graded.score.correct, 0);
    }

    #[test]
    fn complete_applies_once() {
        let mut session = start(&five_words());
        let graded = session.grade(&HashMap::new(), fixed_now()).unwrap();

        session.complete(&graded).unwrap();
        assert!(session.is_completed());
        assert_eq!(session.score().unwrap().incorrect, 5);

        assert_eq!(
            session.complete(&graded).unwrap_err(),
            QuizSessionError::AlreadyCompleted
        );
        assert_eq!(
            session.grade(&HashMap::new(), fixed_now()).unwrap_err(),
            QuizSessionError::AlreadyCompleted
        );
    }

    #[test]
    fn complete_rejects_foreign_grading() {
        let words = five_words();
        let mut a = start(&words);
        let b = start(&words);
        let graded = b.grade(&HashMap::new(), fixed_now()).unwrap();
        assert_eq!(
            a.complete(&graded).unwrap_err(),
            QuizSessionError::SessionMismatch
        );
    }
}
