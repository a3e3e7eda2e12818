use thiserror::Error;

use crate::model::{QuizSessionError, ScoreError, WordError};

/// Umbrella error for callers that do not care which domain rule failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Word(#[from] WordError),
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Session(#[from] QuizSessionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_domain_errors_transparently() {
        let err: Error = QuizSessionError::TooFewWords { available: 2 }.into();
        assert!(matches!(err, Error::Session(_)));
        assert_eq!(
            err.to_string(),
            QuizSessionError::TooFewWords { available: 2 }.to_string()
        );
    }
}
