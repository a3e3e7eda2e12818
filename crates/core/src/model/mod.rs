mod ids;
mod progress;
mod question;
mod quiz;
mod word;

pub use ids::{ParseIdError, SessionId, UserId, WordId};

pub use progress::{MasteryLevel, UserStatistics, WordProgress};
pub use question::{OPTIONS_PER_QUESTION, Question, QuestionError};
pub use quiz::{
    GradedQuiz, MIN_QUIZ_WORDS, NO_ANSWER, QuizMode, QuizScore, QuizSession, QuizSessionError,
    ScoreError, SessionEntry, WordFilter,
};
pub use word::{
    Complexity, MAX_SENTENCES, PartOfSpeech, Word, WordError, normalize_letter,
    starting_letter_of,
};
