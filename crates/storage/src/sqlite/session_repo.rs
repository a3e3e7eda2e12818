use tracing::{debug, warn};
use vocab_core::model::{GradedQuiz, QuizSession, SessionId, UserId, UserStatistics, WordId};

use super::{
    SqliteRepository,
    mapping::{id_i64, letter_to_string, map_session_row, ser},
    progress_repo::{read_statistics, read_word_progress, write_statistics, write_word_progress},
};
use crate::repository::{QuizSessionRepository, StorageError, fold_graded};

const SESSION_COLUMNS: &str = r"
    id, user_id, mode, requested_word_count, letter_filter, complexity_filter, entries,
    correct, incorrect, percentage, created_at, completed_at, is_completed
";

#[async_trait::async_trait]
impl QuizSessionRepository for SqliteRepository {
    async fn insert_session(&self, session: &QuizSession) -> Result<(), StorageError> {
        let entries = serde_json::to_string(session.entries()).map_err(ser)?;
        let score = session.score();

        sqlx::query(
            r"
            INSERT INTO quiz_sessions (
                id, user_id, mode, requested_word_count, letter_filter, complexity_filter,
                entries, correct, incorrect, percentage, created_at, completed_at, is_completed
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ",
        )
        .bind(session.id().to_string())
        .bind(id_i64("user_id", session.user_id().value())?)
        .bind(session.mode().as_str())
        .bind(i64::from(session.requested_word_count()))
        .bind(letter_to_string(session.letter_filter()))
        .bind(session.complexity_filter().map(|c| c.as_str()))
        .bind(entries)
        .bind(score.map(|s| i64::from(s.correct)))
        .bind(score.map(|s| i64::from(s.incorrect)))
        .bind(score.map(|s| i64::from(s.percentage)))
        .bind(session.created_at())
        .bind(session.completed_at())
        .bind(session.is_completed())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
            other => StorageError::Connection(other.to_string()),
        })?;

        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<QuizSession>, StorageError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM quiz_sessions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_session_row).transpose()
    }

    async fn complete_session(&self, graded: &GradedQuiz) -> Result<UserStatistics, StorageError> {
        let session_id = graded.session_id.to_string();
        let user_id = id_i64("user_id", graded.user_id.value())?;
        let entries = serde_json::to_string(&graded.entries).map_err(ser)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        // Claim the session first; the write lock serialises competing completions.
        let res = sqlx::query(
            r"
            UPDATE quiz_sessions
            SET entries = ?1,
                correct = ?2,
                incorrect = ?3,
                percentage = ?4,
                completed_at = ?5,
                is_completed = 1
            WHERE id = ?6 AND user_id = ?7 AND is_completed = 0
            ",
        )
        .bind(entries)
        .bind(i64::from(graded.score.correct))
        .bind(i64::from(graded.score.incorrect))
        .bind(i64::from(graded.score.percentage))
        .bind(graded.completed_at)
        .bind(session_id.as_str())
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM quiz_sessions WHERE id = ?1")
                .bind(session_id.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?
                .is_some();
            if exists {
                warn!(session = %graded.session_id, "session already completed");
                return Err(StorageError::Conflict);
            }
            return Err(StorageError::NotFound);
        }

        let word_ids: Vec<WordId> = graded.entries.iter().map(|e| e.word_id).collect();
        let mut stats = read_statistics(&mut tx, graded.user_id).await?;
        let mut progress = read_word_progress(&mut tx, graded.user_id, &word_ids).await?;
        fold_graded(&mut stats, &mut progress, graded);

        write_statistics(&mut tx, graded.user_id, &stats).await?;
        for row in progress.values() {
            write_word_progress(&mut tx, graded.user_id, row).await?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        debug!(
            session = %graded.session_id,
            percentage = graded.score.percentage,
            "quiz session completed"
        );
        Ok(stats)
    }

    async fn list_completed_sessions(
        &self,
        user_id: UserId,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<QuizSession>, StorageError> {
        let sql = format!(
            r"
            SELECT {SESSION_COLUMNS}
            FROM quiz_sessions
            WHERE user_id = ?1 AND is_completed = 1
            ORDER BY completed_at DESC, created_at DESC
            LIMIT ?2 OFFSET ?3
            "
        );
        let rows = sqlx::query(&sql)
            .bind(id_i64("user_id", user_id.value())?)
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_session_row(&row)?);
        }
        Ok(out)
    }

    async fn count_completed_sessions(&self, user_id: UserId) -> Result<u64, StorageError> {
        let n: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM quiz_sessions WHERE user_id = ?1 AND is_completed = 1",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        u64::try_from(n).map_err(|_| StorageError::Serialization(format!("invalid count: {n}")))
    }
}
