use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use vocab_core::model::{UserId, UserStatistics, WordId, WordProgress};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_progress_row, map_statistics_row},
};
use crate::repository::{ProgressRepository, StorageError};

const STATISTICS_COLUMNS: &str = r"
    SELECT
        total_quizzes_taken, total_flashcard_sessions, total_words_studied, best_score,
        score_sum, current_streak, longest_streak, last_study_date
    FROM user_statistics
    WHERE user_id = ?1
";

pub(super) async fn read_statistics(
    conn: &mut SqliteConnection,
    user_id: UserId,
) -> Result<UserStatistics, StorageError> {
    let row = sqlx::query(STATISTICS_COLUMNS)
        .bind(id_i64("user_id", user_id.value())?)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

    row.as_ref()
        .map(map_statistics_row)
        .transpose()
        .map(Option::unwrap_or_default)
}

pub(super) async fn write_statistics(
    conn: &mut SqliteConnection,
    user_id: UserId,
    stats: &UserStatistics,
) -> Result<(), StorageError> {
    sqlx::query(
        r"
        INSERT INTO user_statistics (
            user_id, total_quizzes_taken, total_flashcard_sessions, total_words_studied,
            best_score, score_sum, current_streak, longest_streak, last_study_date
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(user_id) DO UPDATE SET
            total_quizzes_taken = excluded.total_quizzes_taken,
            total_flashcard_sessions = excluded.total_flashcard_sessions,
            total_words_studied = excluded.total_words_studied,
            best_score = excluded.best_score,
            score_sum = excluded.score_sum,
            current_streak = excluded.current_streak,
            longest_streak = excluded.longest_streak,
            last_study_date = excluded.last_study_date
        ",
    )
    .bind(id_i64("user_id", user_id.value())?)
    .bind(i64::from(stats.total_quizzes_taken))
    .bind(i64::from(stats.total_flashcard_sessions))
    .bind(id_i64("total_words_studied", stats.total_words_studied)?)
    .bind(i64::from(stats.best_score))
    .bind(id_i64("score_sum", stats.score_sum)?)
    .bind(i64::from(stats.current_streak))
    .bind(i64::from(stats.longest_streak))
    .bind(stats.last_study_date)
    .execute(&mut *conn)
    .await
    .map_err(|e| StorageError::Connection(e.to_string()))?;

    Ok(())
}

/// Ids bound per `IN (...)` lookup, well under `SQLite`'s host parameter limit.
const PROGRESS_LOOKUP_CHUNK: usize = 500;

/// Existing progress rows for the given words. Words never answered are absent.
///
/// Large id lists are looked up in chunks of [`PROGRESS_LOOKUP_CHUNK`].
pub(super) async fn read_word_progress(
    conn: &mut SqliteConnection,
    user_id: UserId,
    word_ids: &[WordId],
) -> Result<BTreeMap<WordId, WordProgress>, StorageError> {
    let user = id_i64("user_id", user_id.value())?;
    let mut out = BTreeMap::new();

    for chunk in word_ids.chunks(PROGRESS_LOOKUP_CHUNK) {
        let placeholders: Vec<String> = (0..chunk.len()).map(|i| format!("?{}", i + 2)).collect();
        let sql = format!(
            r"
            SELECT word_id, times_correct, times_incorrect, last_practiced
            FROM word_progress
            WHERE user_id = ?1 AND word_id IN ({})
            ",
            placeholders.join(", ")
        );

        let mut q = sqlx::query(&sql).bind(user);
        for id in chunk {
            q = q.bind(id_i64("word_id", id.value())?);
        }

        let rows = q
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        for row in rows {
            let progress = map_progress_row(&row)?;
            out.insert(progress.word_id, progress);
        }
    }
    Ok(out)
}

pub(super) async fn write_word_progress(
    conn: &mut SqliteConnection,
    user_id: UserId,
    progress: &WordProgress,
) -> Result<(), StorageError> {
    sqlx::query(
        r"
        INSERT INTO word_progress (
            user_id, word_id, times_correct, times_incorrect, last_practiced
        )
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(user_id, word_id) DO UPDATE SET
            times_correct = excluded.times_correct,
            times_incorrect = excluded.times_incorrect,
            last_practiced = excluded.last_practiced
        ",
    )
    .bind(id_i64("user_id", user_id.value())?)
    .bind(id_i64("word_id", progress.word_id.value())?)
    .bind(i64::from(progress.times_correct))
    .bind(i64::from(progress.times_incorrect))
    .bind(progress.last_practiced)
    .execute(&mut *conn)
    .await
    .map_err(|e| StorageError::Connection(e.to_string()))?;

    Ok(())
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_statistics(&self, user_id: UserId) -> Result<UserStatistics, StorageError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        read_statistics(&mut conn, user_id).await
    }

    async fn list_word_progress(&self, user_id: UserId) -> Result<Vec<WordProgress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT word_id, times_correct, times_incorrect, last_practiced
            FROM word_progress
            WHERE user_id = ?1
            ORDER BY word_id ASC
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_progress_row(&row)?);
        }
        Ok(out)
    }

    async fn record_flashcard_session(
        &self,
        user_id: UserId,
        word_count: u32,
        at: DateTime<Utc>,
    ) -> Result<UserStatistics, StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut stats = read_statistics(&mut tx, user_id).await?;
        stats.record_flashcards(word_count, at);
        write_statistics(&mut tx, user_id, &stats).await?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(stats)
    }
}
