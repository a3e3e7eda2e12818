mod plan;
mod service;
mod view;

// Public API of the quiz subsystem.
pub use crate::error::{QuizError, QuizErrorKind};
pub use plan::{QuizBuilder, QuizPlan};
pub use service::{DEFAULT_HISTORY_LIMIT, QuizService};
pub use view::{QuizHistoryPage, QuizOutcome, QuizStart, ReviewItem, StartQuizRequest};
