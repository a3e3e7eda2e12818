use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::ids::WordId;
use crate::time::study_day;

//
// ─── USER STATISTICS ───────────────────────────────────────────────────────────
//

/// Aggregate progress for one learner.
///
/// Keeps a running score sum instead of a stored average, so the average
/// never accumulates rounding error across sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatistics {
    pub total_quizzes_taken: u32,
    pub total_flashcard_sessions: u32,
    pub total_words_studied: u64,
    pub best_score: u32,
    pub score_sum: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_study_date: Option<DateTime<Utc>>,
}

impl UserStatistics {
    /// Mean quiz percentage, rounded half up. Zero before the first quiz.
    #[must_use]
    pub fn average_score(&self) -> u32 {
        let n = u64::from(self.total_quizzes_taken);
        if n == 0 {
            return 0;
        }
        let avg = (self.score_sum * 2 + n) / (2 * n);
        u32::try_from(avg).unwrap_or(u32::MAX)
    }

    /// Fold one completed quiz into the aggregate.
    pub fn record_quiz(&mut self, percentage: u32, word_count: u32, at: DateTime<Utc>) {
        self.total_quizzes_taken = self.total_quizzes_taken.saturating_add(1);
        self.total_words_studied = self
            .total_words_studied
            .saturating_add(u64::from(word_count));
        self.best_score = self.best_score.max(percentage);
        self.score_sum = self.score_sum.saturating_add(u64::from(percentage));
        self.mark_studied(at);
    }

    /// Fold one finished flashcard pass. Quiz scores are left alone.
    pub fn record_flashcards(&mut self, word_count: u32, at: DateTime<Utc>) {
        self.total_flashcard_sessions = self.total_flashcard_sessions.saturating_add(1);
        self.total_words_studied = self
            .total_words_studied
            .saturating_add(u64::from(word_count));
        self.mark_studied(at);
    }

    fn mark_studied(&mut self, at: DateTime<Utc>) {
        let today = study_day(at);
        match self.last_study_date.map(study_day) {
            None => self.current_streak = 1,
            Some(last) if today == last => self.current_streak = self.current_streak.max(1),
            Some(last) if last.succ_opt() == Some(today) => {
                self.current_streak = self.current_streak.saturating_add(1);
            }
            // out-of-order timestamp; keep the later date
            Some(last) if today < last => return,
            Some(_) => self.current_streak = 1,
        }
        self.longest_streak = self.longest_streak.max(self.current_streak);
        self.last_study_date = Some(at);
    }
}

//
// ─── MASTERY ───────────────────────────────────────────────────────────────────
//

/// Coarse per-word familiarity, for progress display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MasteryLevel {
    New,
    Learning,
    Familiar,
    Mastered,
}

impl MasteryLevel {
    pub const ALL: [MasteryLevel; 4] = [
        MasteryLevel::New,
        MasteryLevel::Learning,
        MasteryLevel::Familiar,
        MasteryLevel::Mastered,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MasteryLevel::New => "new",
            MasteryLevel::Learning => "learning",
            MasteryLevel::Familiar => "familiar",
            MasteryLevel::Mastered => "mastered",
        }
    }

    /// Derive a level from answer counts.
    ///
    /// - `Mastered`: at least 5 correct and accuracy ≥ 85%
    /// - `Familiar`: at least 3 correct and accuracy ≥ 60%
    /// - `Learning`: any other attempt history
    #[must_use]
    pub fn from_counts(times_correct: u32, times_incorrect: u32) -> Self {
        let correct = u64::from(times_correct);
        let attempts = correct + u64::from(times_incorrect);
        if attempts == 0 {
            return MasteryLevel::New;
        }
        if correct >= 5 && correct * 100 >= attempts * 85 {
            MasteryLevel::Mastered
        } else if correct >= 3 && correct * 100 >= attempts * 60 {
            MasteryLevel::Familiar
        } else {
            MasteryLevel::Learning
        }
    }
}

impl fmt::Display for MasteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MasteryLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MasteryLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| format!("unknown mastery level: {s}"))
    }
}

//
// ─── WORD PROGRESS ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordProgress {
    pub word_id: WordId,
    pub times_correct: u32,
    pub times_incorrect: u32,
    pub last_practiced: Option<DateTime<Utc>>,
}

impl WordProgress {
    #[must_use]
    pub fn new(word_id: WordId) -> Self {
        Self {
            word_id,
            times_correct: 0,
            times_incorrect: 0,
            last_practiced: None,
        }
    }

    pub fn record(&mut self, correct: bool, at: DateTime<Utc>) {
        if correct {
            self.times_correct = self.times_correct.saturating_add(1);
        } else {
            self.times_incorrect = self.times_incorrect.saturating_add(1);
        }
        self.last_practiced = Some(self.last_practiced.map_or(at, |prev| prev.max(at)));
    }

    #[must_use]
    pub fn mastery(&self) -> MasteryLevel {
        MasteryLevel::from_counts(self.times_correct, self.times_incorrect)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn quiz_aggregation_matches_running_mean() {
        let mut stats = UserStatistics::default();
        assert_eq!(stats.average_score(), 0);

        stats.record_quiz(80, 10, fixed_now());
        assert_eq!(stats.total_quizzes_taken, 1);
        assert_eq!(stats.average_score(), 80);
        assert_eq!(stats.best_score, 80);

        stats.record_quiz(60, 10, fixed_now());
        assert_eq!(stats.total_quizzes_taken, 2);
        assert_eq!(stats.average_score(), 70);
        assert_eq!(stats.best_score, 80);
        assert_eq!(stats.total_words_studied, 20);
    }

    #[test]
    fn average_does_not_drift_over_many_sessions() {
        let mut stats = UserStatistics::default();
        // 33, 34, 33, 34, ... has an exact mean of 33.5
        for i in 0..1000 {
            stats.record_quiz(if i % 2 == 0 { 33 } else { 34 }, 4, fixed_now());
        }
        assert_eq!(stats.average_score(), 34);
        assert_eq!(stats.score_sum, 33_500);
    }

    #[test]
    fn flashcards_do_not_touch_quiz_scores() {
        let mut stats = UserStatistics::default();
        stats.record_flashcards(12, fixed_now());
        assert_eq!(stats.total_flashcard_sessions, 1);
        assert_eq!(stats.total_quizzes_taken, 0);
        assert_eq!(stats.total_words_studied, 12);
        assert_eq!(stats.average_score(), 0);
        assert_eq!(stats.last_study_date, Some(fixed_now()));
    }

    #[test]
    fn streak_counts_consecutive_days() {
        let mut stats = UserStatistics::default();
        let day0 = fixed_now();

        stats.record_quiz(50, 4, day0);
        stats.record_quiz(50, 4, day0 + Duration::minutes(5));
        assert_eq!(stats.current_streak, 1);

        stats.record_quiz(50, 4, day0 + Duration::days(1));
        stats.record_flashcards(4, day0 + Duration::days(2));
        assert_eq!(stats.current_streak, 3);

        stats.record_quiz(50, 4, day0 + Duration::days(5));
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.longest_streak, 3);
    }

    #[test]
    fn backdated_study_keeps_latest_date() {
        let mut stats = UserStatistics::default();
        let now = fixed_now();
        stats.record_quiz(50, 4, now);
        stats.record_quiz(50, 4, now - Duration::days(3));
        assert_eq!(stats.last_study_date, Some(now));
        assert_eq!(stats.current_streak, 1);
    }

    #[test]
    fn mastery_thresholds() {
        assert_eq!(MasteryLevel::from_counts(0, 0), MasteryLevel::New);
        assert_eq!(MasteryLevel::from_counts(1, 0), MasteryLevel::Learning);
        assert_eq!(MasteryLevel::from_counts(3, 2), MasteryLevel::Familiar);
        assert_eq!(MasteryLevel::from_counts(3, 3), MasteryLevel::Learning);
        assert_eq!(MasteryLevel::from_counts(5, 0), MasteryLevel::Mastered);
        assert_eq!(MasteryLevel::from_counts(6, 1), MasteryLevel::Mastered);
        assert_eq!(MasteryLevel::from_counts(5, 2), MasteryLevel::Familiar);
    }

    #[test]
    fn word_progress_records_attempts() {
        let mut progress = WordProgress::new(WordId::new(9));
        assert_eq!(progress.mastery(), MasteryLevel::New);

        progress.record(true, fixed_now());
        progress.record(false, fixed_now() - Duration::hours(1));
        assert_eq!(progress.times_correct, 1);
        assert_eq!(progress.times_incorrect, 1);
        assert_eq!(progress.last_practiced, Some(fixed_now()));
        assert_eq!(progress.mastery(), MasteryLevel::Learning);
        assert_eq!("familiar".parse::<MasteryLevel>().unwrap(), MasteryLevel::Familiar);
    }
}
