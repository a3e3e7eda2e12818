use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};
use vocab_core::model::{QuizSession, SessionId, UserId, WordFilter, WordId};
use storage::repository::{QuizSessionRepository, StorageError, WordRepository};

use super::plan::QuizBuilder;
use super::view::{QuizHistoryPage, QuizOutcome, QuizStart, ReviewItem, StartQuizRequest};
use crate::Clock;
use crate::error::QuizError;
use crate::rng::SharedRng;

/// Default page size for quiz history.
pub const DEFAULT_HISTORY_LIMIT: u32 = 10;

/// The quiz session engine: builds sessions, scores them once, and folds the
/// result into the learner's statistics.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    words: Arc<dyn WordRepository>,
    sessions: Arc<dyn QuizSessionRepository>,
    rng: SharedRng,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        words: Arc<dyn WordRepository>,
        sessions: Arc<dyn QuizSessionRepository>,
    ) -> Self {
        Self {
            clock,
            words,
            sessions,
            rng: SharedRng::from_entropy(),
        }
    }

    /// Use the given random source, e.g. a seeded one for reproducible quizzes.
    #[must_use]
    pub fn with_rng(mut self, rng: SharedRng) -> Self {
        self.rng = rng;
        self
    }

    /// Start a quiz: draw words from the filtered pool, persist the session,
    /// and return its questions.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidRequest` for a non-positive count,
    /// `QuizError::InsufficientWords` when the pool cannot fill four options,
    /// and `QuizError::Storage` for repository failures.
    pub async fn start_quiz(&self, request: StartQuizRequest) -> Result<QuizStart, QuizError> {
        if request.requested_count < 1 {
            return Err(QuizError::InvalidRequest(format!(
                "requested word count must be a positive integer, got {}",
                request.requested_count
            )));
        }
        let requested = u32::try_from(request.requested_count).unwrap_or(u32::MAX);
        let filter = WordFilter::new(request.letter, request.complexity);

        let pool = self.words.list_words(filter).await?;
        let plan = self
            .rng
            .with(|rng| QuizBuilder::new(&pool, requested).build(rng))
            .inspect_err(|err| {
                if let QuizError::InsufficientWords { available } = err {
                    warn!(
                        requested,
                        available,
                        letter = ?filter.letter,
                        complexity = ?filter.complexity,
                        "quiz pool too small"
                    );
                }
            })?;

        let session = QuizSession::start(
            SessionId::generate(),
            request.user_id,
            request.mode,
            requested,
            filter,
            &plan.words,
            self.clock.now(),
        )?;
        self.sessions.insert_session(&session).await?;

        info!(
            session_id = %session.id(),
            user_id = %request.user_id,
            requested,
            available = pool.len(),
            questions = plan.total(),
            "quiz started"
        );

        Ok(QuizStart {
            session_id: session.id(),
            total_questions: plan.total(),
            questions: plan.questions,
        })
    }

    /// Score a quiz and record the result. Applied at most once per session.
    ///
    /// Every entry is judged; words absent from `answers` count as incorrect.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotFound` for an unknown session,
    /// `QuizError::AlreadyCompleted` if it was scored before, and
    /// `QuizError::Storage` for repository failures (nothing is committed).
    pub async fn complete_quiz(
        &self,
        session_id: SessionId,
        answers: &HashMap<WordId, String>,
    ) -> Result<QuizOutcome, QuizError> {
        let session = self.get_session(session_id).await?;
        let graded = session.grade(answers, self.clock.now())?;

        let stats = match self.sessions.complete_session(&graded).await {
            Ok(stats) => stats,
            Err(StorageError::Conflict) => return Err(QuizError::AlreadyCompleted),
            Err(StorageError::NotFound) => return Err(QuizError::NotFound),
            Err(err) => return Err(err.into()),
        };

        info!(
            session_id = %session_id,
            user_id = %graded.user_id,
            correct = graded.score.correct,
            incorrect = graded.score.incorrect,
            percentage = graded.score.percentage,
            "quiz completed"
        );
        debug!(
            total_quizzes = stats.total_quizzes_taken,
            average = stats.average_score(),
            best = stats.best_score,
            "statistics updated"
        );

        Ok(QuizOutcome {
            session_id,
            score: graded.score,
            total_questions: graded.entries.len(),
            review: graded.entries.iter().map(ReviewItem::from_entry).collect(),
        })
    }

    /// Fetch a stored session.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotFound` for an unknown id.
    pub async fn get_session(&self, session_id: SessionId) -> Result<QuizSession, QuizError> {
        self.sessions
            .get_session(session_id)
            .await?
            .ok_or(QuizError::NotFound)
    }

    /// Completed sessions for `user_id`, newest first.
    ///
    /// Pages start at 1; a zero page or limit falls back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Storage` for repository failures.
    pub async fn history(
        &self,
        user_id: UserId,
        page: u32,
        limit: u32,
    ) -> Result<QuizHistoryPage, QuizError> {
        let page = page.max(1);
        let limit = if limit == 0 { DEFAULT_HISTORY_LIMIT } else { limit };
        let offset = (page - 1).saturating_mul(limit);

        let total_sessions = self.sessions.count_completed_sessions(user_id).await?;
        let sessions = self
            .sessions
            .list_completed_sessions(user_id, offset, limit)
            .await?;

        Ok(QuizHistoryPage {
            sessions,
            current_page: page,
            total_pages: u32::try_from(total_sessions.div_ceil(u64::from(limit)))
                .unwrap_or(u32::MAX),
            total_sessions,
        })
    }
}
