use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use storage::repository::{ProgressRepository, WordRepository};
use vocab_core::model::{
    MasteryLevel, UserId, UserStatistics, Word, WordFilter, WordId, normalize_letter,
};

use crate::Clock;
use crate::error::ProgressServiceError;

/// Statistics as shown to a learner, with the derived average.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsView {
    pub total_quizzes_taken: u32,
    pub total_flashcard_sessions: u32,
    pub total_words_studied: u64,
    pub average_score: u32,
    pub best_score: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_study_date: Option<DateTime<Utc>>,
}

impl From<&UserStatistics> for StatisticsView {
    fn from(stats: &UserStatistics) -> Self {
        Self {
            total_quizzes_taken: stats.total_quizzes_taken,
            total_flashcard_sessions: stats.total_flashcard_sessions,
            total_words_studied: stats.total_words_studied,
            average_score: stats.average_score(),
            best_score: stats.best_score,
            current_streak: stats.current_streak,
            longest_streak: stats.longest_streak,
            last_study_date: stats.last_study_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnedWord {
    pub word: Word,
    pub times_correct: u32,
    pub times_incorrect: u32,
    pub last_practiced: Option<DateTime<Utc>>,
    pub mastery_level: MasteryLevel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MasteryBreakdown {
    pub new: u64,
    pub learning: u64,
    pub familiar: u64,
    pub mastered: u64,
}

impl MasteryBreakdown {
    fn add(&mut self, level: MasteryLevel) {
        let slot = match level {
            MasteryLevel::New => &mut self.new,
            MasteryLevel::Learning => &mut self.learning,
            MasteryLevel::Familiar => &mut self.familiar,
            MasteryLevel::Mastered => &mut self.mastered,
        };
        *slot += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordsLearned {
    pub words: Vec<LearnedWord>,
    pub total: u64,
    pub breakdown: MasteryBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LetterProgress {
    pub letter: char,
    pub total_words: u64,
    pub words_learned: u64,
    pub percentage: u32,
}

/// `round(part / whole * 100)`, half up; zero for an empty whole.
fn percent(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    let value = (part * 200 + whole) / (2 * whole);
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Learner-facing progress queries and flashcard bookkeeping.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
    words: Arc<dyn WordRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        progress: Arc<dyn ProgressRepository>,
        words: Arc<dyn WordRepository>,
    ) -> Self {
        Self {
            clock,
            progress,
            words,
        }
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` for repository failures.
    pub async fn statistics(&self, user_id: UserId) -> Result<StatisticsView, ProgressServiceError> {
        let stats = self.progress.get_statistics(user_id).await?;
        Ok(StatisticsView::from(&stats))
    }

    /// Words the user has practiced at least once, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` for repository failures.
    pub async fn words_learned(&self, user_id: UserId) -> Result<WordsLearned, ProgressServiceError> {
        let mut rows = self.progress.list_word_progress(user_id).await?;
        rows.sort_by(|a, b| {
            b.last_practiced
                .cmp(&a.last_practiced)
                .then(a.word_id.cmp(&b.word_id))
        });

        let mut breakdown = MasteryBreakdown::default();
        let mut words = Vec::with_capacity(rows.len());
        for row in rows {
            // progress can outlive a re-seeded corpus
            let Some(word) = self.words.get_word(row.word_id).await? else {
                continue;
            };
            let mastery_level = row.mastery();
            breakdown.add(mastery_level);
            words.push(LearnedWord {
                word,
                times_correct: row.times_correct,
                times_incorrect: row.times_incorrect,
                last_practiced: row.last_practiced,
                mastery_level,
            });
        }

        Ok(WordsLearned {
            total: words.len() as u64,
            words,
            breakdown,
        })
    }

    /// Share of a letter's words the user has practiced.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` for repository failures.
    pub async fn letter_progress(
        &self,
        user_id: UserId,
        letter: char,
    ) -> Result<LetterProgress, ProgressServiceError> {
        let letter = normalize_letter(letter);
        let words = self
            .words
            .list_words(WordFilter::new(Some(letter), None))
            .await?;
        let practiced = self.practiced_ids(user_id).await?;
        let learned = words.iter().filter(|w| practiced.contains(&w.id())).count() as u64;
        let total = words.len() as u64;

        Ok(LetterProgress {
            letter,
            total_words: total,
            words_learned: learned,
            percentage: percent(learned, total),
        })
    }

    /// Progress for every letter present in the corpus, sorted by letter.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` for repository failures.
    pub async fn all_letters_progress(
        &self,
        user_id: UserId,
    ) -> Result<Vec<LetterProgress>, ProgressServiceError> {
        let words = self.words.list_words(WordFilter::default()).await?;
        let practiced = self.practiced_ids(user_id).await?;

        let mut by_letter: HashMap<char, (u64, u64)> = HashMap::new();
        for word in &words {
            let slot = by_letter.entry(word.starting_letter()).or_default();
            slot.0 += 1;
            if practiced.contains(&word.id()) {
                slot.1 += 1;
            }
        }

        let mut out: Vec<LetterProgress> = by_letter
            .into_iter()
            .map(|(letter, (total, learned))| LetterProgress {
                letter,
                total_words: total,
                words_learned: learned,
                percentage: percent(learned, total),
            })
            .collect();
        out.sort_by_key(|p| p.letter);
        Ok(out)
    }

    /// Record a finished flashcard pass of `word_count` cards.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::EmptyDeck` for zero cards and
    /// `ProgressServiceError::Storage` for repository failures.
    pub async fn record_flashcards(
        &self,
        user_id: UserId,
        word_count: usize,
    ) -> Result<StatisticsView, ProgressServiceError> {
        if word_count == 0 {
            return Err(ProgressServiceError::EmptyDeck);
        }
        let count = u32::try_from(word_count).unwrap_or(u32::MAX);
        let stats = self
            .progress
            .record_flashcard_session(user_id, count, self.clock.now())
            .await?;

        info!(
            user_id = %user_id,
            cards = count,
            sessions = stats.total_flashcard_sessions,
            streak = stats.current_streak,
            "flashcard session recorded"
        );
        Ok(StatisticsView::from(&stats))
    }

    async fn practiced_ids(&self, user_id: UserId) -> Result<HashSet<WordId>, ProgressServiceError> {
        Ok(self
            .progress
            .list_word_progress(user_id)
            .await?
            .into_iter()
            .map(|p| p.word_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(4, 4), 100);
    }

    #[test]
    fn breakdown_counts_each_level() {
        let mut breakdown = MasteryBreakdown::default();
        breakdown.add(MasteryLevel::Learning);
        breakdown.add(MasteryLevel::Learning);
        breakdown.add(MasteryLevel::Mastered);
        assert_eq!(breakdown.learning, 2);
        assert_eq!(breakdown.mastered, 1);
        assert_eq!(breakdown.new + breakdown.familiar, 0);
    }

    #[test]
    fn statistics_view_exposes_average() {
        let mut stats = UserStatistics::default();
        stats.record_quiz(80, 5, vocab_core::time::fixed_now());
        stats.record_quiz(60, 5, vocab_core::time::fixed_now());
        let view = StatisticsView::from(&stats);
        assert_eq!(view.average_score, 70);
        assert_eq!(view.best_score, 80);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["averageScore"], 70);
        assert_eq!(json["totalQuizzesTaken"], 2);
    }
}
