use serde::Serialize;

use vocab_core::model::{
    Complexity, PartOfSpeech, QuizMode, QuizScore, QuizSession, SessionEntry, SessionId, UserId,
    Question,
};

/// Parameters for starting a quiz.
///
/// The count is signed so that out-of-range input from callers reaches the
/// engine and is rejected there with `InvalidRequest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartQuizRequest {
    pub user_id: UserId,
    pub requested_count: i64,
    pub letter: Option<char>,
    pub complexity: Option<Complexity>,
    pub mode: QuizMode,
}

impl StartQuizRequest {
    /// A quiz-mode request for the local user with no filters.
    #[must_use]
    pub fn new(requested_count: i64) -> Self {
        Self {
            user_id: UserId::LOCAL,
            requested_count,
            letter: None,
            complexity: None,
            mode: QuizMode::default(),
        }
    }

    #[must_use]
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = user_id;
        self
    }

    #[must_use]
    pub fn with_letter(mut self, letter: Option<char>) -> Self {
        self.letter = letter;
        self
    }

    #[must_use]
    pub fn with_complexity(mut self, complexity: Option<Complexity>) -> Self {
        self.complexity = complexity;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: QuizMode) -> Self {
        self.mode = mode;
        self
    }
}

/// What a caller gets back from starting a quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizStart {
    pub session_id: SessionId,
    pub questions: Vec<Question>,
    pub total_questions: usize,
}

/// One line of the post-quiz review, in question order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub word: String,
    pub definition: String,
    pub part_of_speech: PartOfSpeech,
    pub sentences: Vec<String>,
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
}

impl ReviewItem {
    pub(crate) fn from_entry(entry: &SessionEntry) -> Self {
        Self {
            word: entry.word.text().to_string(),
            definition: entry.word.definition().to_string(),
            part_of_speech: entry.word.part_of_speech(),
            sentences: entry.word.sentences().to_vec(),
            user_answer: entry.answer_or_sentinel().to_string(),
            correct_answer: entry.word.text().to_string(),
            is_correct: entry.is_correct.unwrap_or(false),
        }
    }
}

/// Scored result of a completed quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOutcome {
    pub session_id: SessionId,
    pub score: QuizScore,
    pub total_questions: usize,
    pub review: Vec<ReviewItem>,
}

/// A page of completed sessions, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizHistoryPage {
    pub sessions: Vec<QuizSession>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_sessions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use vocab_core::model::{NO_ANSWER, Word, WordId};

    #[test]
    fn review_item_uses_sentinel_for_missing_answer() {
        let word = Word::new(
            WordId::new(1),
            "zeal",
            "great energy",
            PartOfSpeech::Noun,
            vec!["She worked with zeal.".into()],
            Complexity::Simple,
        )
        .unwrap();
        let mut entry = SessionEntry::snapshot(&word);
        entry.is_correct = Some(false);

        let item = ReviewItem::from_entry(&entry);
        assert_eq!(item.user_answer, NO_ANSWER);
        assert_eq!(item.correct_answer, "zeal");
        assert!(!item.is_correct);

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["userAnswer"], "No answer");
        assert_eq!(json["partOfSpeech"], "noun");
    }

    #[test]
    fn request_builder_sets_filters() {
        let req = StartQuizRequest::new(10)
            .with_letter(Some('q'))
            .with_complexity(Some(Complexity::High))
            .with_mode(QuizMode::Flashcard);
        assert_eq!(req.user_id, UserId::LOCAL);
        assert_eq!(req.letter, Some('q'));
        assert_eq!(req.mode, QuizMode::Flashcard);
    }
}
