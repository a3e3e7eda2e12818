//! Shared error types for the services crate.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use vocab_core::model::{QuestionError, QuizSessionError};

/// Stable, machine-readable category of a [`QuizError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizErrorKind {
    InvalidRequest,
    InsufficientWords,
    NotFound,
    AlreadyCompleted,
    Internal,
}

impl QuizErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuizErrorKind::InvalidRequest => "invalid_request",
            QuizErrorKind::InsufficientWords => "insufficient_words",
            QuizErrorKind::NotFound => "not_found",
            QuizErrorKind::AlreadyCompleted => "already_completed",
            QuizErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for QuizErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors emitted by `QuizService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("not enough words for a quiz: need at least 4, found {available}")]
    InsufficientWords { available: usize },

    #[error("quiz session not found")]
    NotFound,

    #[error("quiz session already completed")]
    AlreadyCompleted,

    #[error(transparent)]
    Question(#[from] QuestionError),

    #[error(transparent)]
    Session(QuizSessionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl QuizError {
    #[must_use]
    pub fn kind(&self) -> QuizErrorKind {
        match self {
            QuizError::InvalidRequest(_) => QuizErrorKind::InvalidRequest,
            QuizError::InsufficientWords { .. } => QuizErrorKind::InsufficientWords,
            QuizError::NotFound => QuizErrorKind::NotFound,
            QuizError::AlreadyCompleted => QuizErrorKind::AlreadyCompleted,
            QuizError::Question(_) | QuizError::Session(_) | QuizError::Storage(_) => {
                QuizErrorKind::Internal
            }
        }
    }
}

impl From<QuizSessionError> for QuizError {
    fn from(err: QuizSessionError) -> Self {
        match err {
            QuizSessionError::InvalidRequestedCount => {
                QuizError::InvalidRequest("requested word count must be positive".into())
            }
            QuizSessionError::TooFewWords { available } => {
                QuizError::InsufficientWords { available }
            }
            QuizSessionError::AlreadyCompleted => QuizError::AlreadyCompleted,
            other => QuizError::Session(other),
        }
    }
}

/// Errors emitted by `CorpusService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CorpusServiceError {
    #[error("word not found")]
    NotFound,

    #[error("not enough words available: found {available}, requested {requested}")]
    NotEnoughWords { available: u64, requested: u32 },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService` and flashcard bookkeeping.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("cannot record an empty flashcard deck")]
    EmptyDeck,

    #[error(transparent)]
    Corpus(#[from] CorpusServiceError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
