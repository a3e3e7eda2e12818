use std::collections::HashMap;

use sqlx::{Row, SqliteConnection};
use tracing::{debug, info};
use vocab_core::model::{Complexity, Word, WordFilter, WordId};

use super::{
    SqliteRepository,
    mapping::{id_i64, letter_from_str, letter_to_string, map_word_row, ser, word_id_from_i64},
};
use crate::repository::{BucketCount, CorpusSync, StorageError, WordRepository, plan_sync};

fn map_write_err(e: sqlx::Error) -> StorageError {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        other => StorageError::Connection(other.to_string()),
    }
}

/// Insert or replace one word by id.
async fn write_word(conn: &mut SqliteConnection, word: &Word) -> Result<(), StorageError> {
    let sentences = serde_json::to_string(word.sentences()).map_err(ser)?;
    sqlx::query(
        r"
        INSERT INTO words (
            id, text, definition, part_of_speech, sentences, starting_letter, complexity
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(id) DO UPDATE SET
            text = excluded.text,
            definition = excluded.definition,
            part_of_speech = excluded.part_of_speech,
            sentences = excluded.sentences,
            starting_letter = excluded.starting_letter,
            complexity = excluded.complexity
        ",
    )
    .bind(id_i64("word_id", word.id().value())?)
    .bind(word.text())
    .bind(word.definition())
    .bind(word.part_of_speech().as_str())
    .bind(sentences)
    .bind(word.starting_letter().to_string())
    .bind(word.complexity().as_str())
    .execute(&mut *conn)
    .await
    .map_err(map_write_err)?;
    Ok(())
}

fn count_from_i64(v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid count: {v}")))
}

#[async_trait::async_trait]
impl WordRepository for SqliteRepository {
    async fn upsert_words(&self, words: &[Word]) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for word in words {
            write_word(&mut tx, word).await?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        debug!(count = words.len(), "upserted corpus words");
        Ok(())
    }

    async fn sync_words(&self, words: &[Word]) -> Result<CorpusSync, StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let rows = sqlx::query("SELECT id, text FROM words")
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut stored = Vec::with_capacity(rows.len());
        for row in rows {
            let id = word_id_from_i64(row.try_get("id").map_err(ser)?)?;
            let text: String = row.try_get("text").map_err(ser)?;
            stored.push((id, text));
        }

        let plan = plan_sync(&stored, words)?;

        for id in &plan.removed {
            let id = id_i64("word_id", id.value())?;
            sqlx::query("DELETE FROM word_progress WHERE word_id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            sqlx::query("DELETE FROM words WHERE id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;
        }
        for word in &plan.words {
            write_word(&mut tx, word).await?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        info!(
            inserted = plan.summary.inserted,
            updated = plan.summary.updated,
            removed = plan.summary.removed,
            "synced corpus words"
        );
        Ok(plan.summary)
    }

    async fn get_word(&self, id: WordId) -> Result<Option<Word>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, text, definition, part_of_speech, sentences, starting_letter, complexity
            FROM words
            WHERE id = ?1
            ",
        )
        .bind(id_i64("word_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_word_row).transpose()
    }

    async fn list_words(&self, filter: WordFilter) -> Result<Vec<Word>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, text, definition, part_of_speech, sentences, starting_letter, complexity
            FROM words
            WHERE (?1 IS NULL OR starting_letter = ?1)
              AND (?2 IS NULL OR complexity = ?2)
            ORDER BY id ASC
            ",
        )
        .bind(letter_to_string(filter.letter))
        .bind(filter.complexity.map(Complexity::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut words = Vec::with_capacity(rows.len());
        for row in rows {
            words.push(map_word_row(&row)?);
        }
        Ok(words)
    }

    async fn count_words(&self, filter: WordFilter) -> Result<u64, StorageError> {
        let n: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*)
            FROM words
            WHERE (?1 IS NULL OR starting_letter = ?1)
              AND (?2 IS NULL OR complexity = ?2)
            ",
        )
        .bind(letter_to_string(filter.letter))
        .bind(filter.complexity.map(Complexity::as_str))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        count_from_i64(n)
    }

    async fn letter_counts(&self) -> Result<Vec<BucketCount<char>>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT starting_letter, COUNT(*) AS n
            FROM words
            GROUP BY starting_letter
            ORDER BY starting_letter ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let letter: String = row.try_get("starting_letter").map_err(ser)?;
            out.push(BucketCount {
                key: letter_from_str("starting_letter", &letter)?,
                count: count_from_i64(row.try_get("n").map_err(ser)?)?,
            });
        }
        Ok(out)
    }

    async fn complexity_counts(&self) -> Result<Vec<BucketCount<Complexity>>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT complexity, COUNT(*) AS n
            FROM words
            GROUP BY complexity
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut by_tag: HashMap<Complexity, u64> = HashMap::with_capacity(rows.len());
        for row in rows {
            let tag: Complexity = row
                .try_get::<String, _>("complexity")
                .map_err(ser)?
                .parse()
                .map_err(ser)?;
            by_tag.insert(tag, count_from_i64(row.try_get("n").map_err(ser)?)?);
        }

        Ok(Complexity::ALL
            .into_iter()
            .map(|key| BucketCount {
                key,
                count: by_tag.get(&key).copied().unwrap_or(0),
            })
            .collect())
    }
}
