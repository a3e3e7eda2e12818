use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use super::SqliteInitError;

/// Runs the versioned schema migrations.
///
/// Version 1 creates the corpus, quiz sessions, statistics and per-word progress.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS words (
                    id INTEGER PRIMARY KEY,
                    text TEXT NOT NULL UNIQUE,
                    definition TEXT NOT NULL,
                    part_of_speech TEXT NOT NULL,
                    sentences TEXT NOT NULL,
                    starting_letter TEXT NOT NULL,
                    complexity TEXT NOT NULL
                        CHECK (complexity IN ('simple', 'medium', 'high'))
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS quiz_sessions (
                    id TEXT PRIMARY KEY,
                    user_id INTEGER NOT NULL,
                    mode TEXT NOT NULL,
                    requested_word_count INTEGER NOT NULL CHECK (requested_word_count > 0),
                    letter_filter TEXT,
                    complexity_filter TEXT,
                    entries TEXT NOT NULL,
                    correct INTEGER CHECK (correct >= 0),
                    incorrect INTEGER CHECK (incorrect >= 0),
                    percentage INTEGER CHECK (percentage BETWEEN 0 AND 100),
                    created_at TEXT NOT NULL,
                    completed_at TEXT,
                    is_completed INTEGER NOT NULL DEFAULT 0 CHECK (is_completed IN (0, 1))
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS user_statistics (
                    user_id INTEGER PRIMARY KEY,
                    total_quizzes_taken INTEGER NOT NULL CHECK (total_quizzes_taken >= 0),
                    total_flashcard_sessions INTEGER NOT NULL CHECK (total_flashcard_sessions >= 0),
                    total_words_studied INTEGER NOT NULL CHECK (total_words_studied >= 0),
                    best_score INTEGER NOT NULL CHECK (best_score BETWEEN 0 AND 100),
                    score_sum INTEGER NOT NULL CHECK (score_sum >= 0),
                    current_streak INTEGER NOT NULL CHECK (current_streak >= 0),
                    longest_streak INTEGER NOT NULL CHECK (longest_streak >= 0),
                    last_study_date TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS word_progress (
                    user_id INTEGER NOT NULL,
                    word_id INTEGER NOT NULL,
                    times_correct INTEGER NOT NULL CHECK (times_correct >= 0),
                    times_incorrect INTEGER NOT NULL CHECK (times_incorrect >= 0),
                    last_practiced TEXT,
                    PRIMARY KEY (user_id, word_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_words_letter_complexity
                    ON words (starting_letter, complexity);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_quiz_sessions_user_completed
                    ON quiz_sessions (user_id, is_completed, completed_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(version = 1, "applied sqlite migration");
    }

    Ok(())
}
