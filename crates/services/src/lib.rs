#![forbid(unsafe_code)]

pub mod app_services;
pub mod corpus_service;
pub mod error;
pub mod flashcard;
pub mod progress_service;
pub mod quiz;
pub mod rng;

pub use vocab_core::Clock;

pub use app_services::AppServices;
pub use corpus_service::{ComplexityCount, CorpusService, LetterCount, WordPage};
pub use error::{AppServicesError, CorpusServiceError, ProgressServiceError, QuizError, QuizErrorKind};
pub use flashcard::{FlashcardDeck, FlashcardService};
pub use progress_service::{
    LearnedWord, LetterProgress, MasteryBreakdown, ProgressService, StatisticsView, WordsLearned,
};
pub use quiz::{
    QuizBuilder, QuizHistoryPage, QuizOutcome, QuizPlan, QuizService, QuizStart, ReviewItem,
    StartQuizRequest,
};
pub use rng::SharedRng;
