use std::sync::Arc;

use storage::repository::Storage;
use vocab_core::model::Word;

use crate::Clock;
use crate::corpus_service::CorpusService;
use crate::error::AppServicesError;
use crate::flashcard::FlashcardService;
use crate::progress_service::ProgressService;
use crate::quiz::QuizService;
use crate::rng::SharedRng;

/// Assembles app-facing services over one storage backend.
///
/// All services share a single random source, so a seed makes a whole run
/// reproducible.
#[derive(Clone)]
pub struct AppServices {
    quiz: Arc<QuizService>,
    corpus: Arc<CorpusService>,
    progress: Arc<ProgressService>,
    flashcards: Arc<FlashcardService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        seed: Option<u64>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, seed))
    }

    /// Build services over an in-memory store holding `words`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Storage` if two words share a text.
    pub fn in_memory_with_words(
        words: impl IntoIterator<Item = Word>,
        clock: Clock,
        seed: Option<u64>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::in_memory_with_words(words)?;
        Ok(Self::from_storage(&storage, clock, seed))
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, seed: Option<u64>) -> Self {
        let rng = SharedRng::from_seed_option(seed);

        let corpus = CorpusService::new(Arc::clone(&storage.words)).with_rng(rng.clone());
        let progress = ProgressService::new(
            clock,
            Arc::clone(&storage.progress),
            Arc::clone(&storage.words),
        );
        let quiz = QuizService::new(
            clock,
            Arc::clone(&storage.words),
            Arc::clone(&storage.sessions),
        )
        .with_rng(rng.clone());
        let flashcards = FlashcardService::new(corpus.clone(), progress.clone(), rng);

        Self {
            quiz: Arc::new(quiz),
            corpus: Arc::new(corpus),
            progress: Arc::new(progress),
            flashcards: Arc::new(flashcards),
        }
    }

    #[must_use]
    pub fn quiz(&self) -> Arc<QuizService> {
        Arc::clone(&self.quiz)
    }

    #[must_use]
    pub fn corpus(&self) -> Arc<CorpusService> {
        Arc::clone(&self.corpus)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn flashcards(&self) -> Arc<FlashcardService> {
        Arc::clone(&self.flashcards)
    }
}
