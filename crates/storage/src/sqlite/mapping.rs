use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use vocab_core::model::{
    Complexity, PartOfSpeech, QuizMode, QuizScore, QuizSession, SessionEntry, SessionId, UserId,
    UserStatistics, Word, WordFilter, WordId, WordProgress,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn u64_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn get_u32(row: &SqliteRow, field: &'static str) -> Result<u32, StorageError> {
    u32_from_i64(field, row.try_get::<i64, _>(field).map_err(ser)?)
}

pub(crate) fn word_id_from_i64(v: i64) -> Result<WordId, StorageError> {
    Ok(WordId::new(u64_from_i64("word_id", v)?))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(u64_from_i64("user_id", v)?))
}

pub(crate) fn letter_from_str(field: &'static str, s: &str) -> Result<char, StorageError> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(StorageError::Serialization(format!("invalid {field}: {s:?}"))),
    }
}

pub(crate) fn letter_to_string(letter: Option<char>) -> Option<String> {
    letter.map(String::from)
}

pub(crate) fn map_word_row(row: &SqliteRow) -> Result<Word, StorageError> {
    let sentences_json: String = row.try_get("sentences").map_err(ser)?;
    let sentences: Vec<String> = serde_json::from_str(&sentences_json).map_err(ser)?;
    let part_of_speech: PartOfSpeech = row
        .try_get::<String, _>("part_of_speech")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let complexity: Complexity = row
        .try_get::<String, _>("complexity")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let letter = letter_from_str(
        "starting_letter",
        &row.try_get::<String, _>("starting_letter").map_err(ser)?,
    )?;

    Word::from_persisted(
        word_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get("text").map_err(ser)?,
        row.try_get("definition").map_err(ser)?,
        part_of_speech,
        sentences,
        letter,
        complexity,
    )
    .map_err(ser)
}

pub(crate) fn map_session_row(row: &SqliteRow) -> Result<QuizSession, StorageError> {
    let id: SessionId = row
        .try_get::<String, _>("id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let mode: QuizMode = row
        .try_get::<String, _>("mode")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;

    let letter = row
        .try_get::<Option<String>, _>("letter_filter")
        .map_err(ser)?
        .map(|s| letter_from_str("letter_filter", &s))
        .transpose()?;
    let complexity = row
        .try_get::<Option<String>, _>("complexity_filter")
        .map_err(ser)?
        .map(|s| s.parse::<Complexity>().map_err(ser))
        .transpose()?;

    let entries_json: String = row.try_get("entries").map_err(ser)?;
    let entries: Vec<SessionEntry> = serde_json::from_str(&entries_json).map_err(ser)?;

    let correct: Option<i64> = row.try_get("correct").map_err(ser)?;
    let incorrect: Option<i64> = row.try_get("incorrect").map_err(ser)?;
    let percentage: Option<i64> = row.try_get("percentage").map_err(ser)?;
    let score = match (correct, incorrect, percentage) {
        (Some(c), Some(i), Some(p)) => Some(QuizScore {
            correct: u32_from_i64("correct", c)?,
            incorrect: u32_from_i64("incorrect", i)?,
            percentage: u32_from_i64("percentage", p)?,
        }),
        _ => None,
    };

    let is_completed: bool = row.try_get("is_completed").map_err(ser)?;
    let completed_at: Option<DateTime<Utc>> = row.try_get("completed_at").map_err(ser)?;
    if is_completed != completed_at.is_some() {
        return Err(StorageError::Serialization(format!(
            "session {id} has inconsistent completion state"
        )));
    }

    QuizSession::from_persisted(
        id,
        user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        mode,
        get_u32(row, "requested_word_count")?,
        WordFilter { letter, complexity },
        entries,
        score,
        row.try_get("created_at").map_err(ser)?,
        completed_at,
    )
    .map_err(ser)
}

pub(crate) fn map_statistics_row(row: &SqliteRow) -> Result<UserStatistics, StorageError> {
    Ok(UserStatistics {
        total_quizzes_taken: get_u32(row, "total_quizzes_taken")?,
        total_flashcard_sessions: get_u32(row, "total_flashcard_sessions")?,
        total_words_studied: u64_from_i64(
            "total_words_studied",
            row.try_get::<i64, _>("total_words_studied").map_err(ser)?,
        )?,
        best_score: get_u32(row, "best_score")?,
        score_sum: u64_from_i64(
            "score_sum",
            row.try_get::<i64, _>("score_sum").map_err(ser)?,
        )?,
        current_streak: get_u32(row, "current_streak")?,
        longest_streak: get_u32(row, "longest_streak")?,
        last_study_date: row.try_get("last_study_date").map_err(ser)?,
    })
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<WordProgress, StorageError> {
    Ok(WordProgress {
        word_id: word_id_from_i64(row.try_get::<i64, _>("word_id").map_err(ser)?)?,
        times_correct: get_u32(row, "times_correct")?,
        times_incorrect: get_u32(row, "times_incorrect")?,
        last_practiced: row.try_get("last_practiced").map_err(ser)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_must_be_single_chars() {
        assert_eq!(letter_from_str("letter", "Q").unwrap(), 'Q');
        assert!(letter_from_str("letter", "").is_err());
        assert!(letter_from_str("letter", "QU").is_err());
        assert_eq!(letter_to_string(Some('Z')).as_deref(), Some("Z"));
    }

    #[test]
    fn negative_ids_are_rejected() {
        assert!(word_id_from_i64(-1).is_err());
        assert_eq!(user_id_from_i64(1).unwrap(), UserId::LOCAL);
        assert!(id_i64("word_id", u64::MAX).is_err());
    }
}
