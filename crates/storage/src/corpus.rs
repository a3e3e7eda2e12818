//! Loading the word corpus from JSON files.
//!
//! Files look like `{ "words": [ { "word": ..., "definition": ..., ... } ] }`.
//! Several files are concatenated in order and ids are assigned from 1.
//! These ids are positional; importing through `WordRepository::sync_words`
//! re-resolves them against the store by text.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use vocab_core::model::{
    Complexity, MAX_SENTENCES, PartOfSpeech, Word, WordError, WordId, starting_letter_of,
};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CorpusError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid corpus JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Raw row as it appears in a corpus file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusRow {
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub part_of_speech: Option<String>,
    #[serde(default)]
    pub sentences: Vec<String>,
    #[serde(default)]
    pub starting_letter: Option<String>,
    #[serde(default)]
    pub complexity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CorpusFile {
    words: Vec<CorpusRow>,
}

/// Why a row was left out of the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Invalid(WordError),
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub word: String,
    pub reason: SkipReason,
}

/// Words accepted from one or more corpus files.
#[derive(Debug, Clone, Default)]
pub struct CorpusLoad {
    pub words: Vec<Word>,
    pub skipped: Vec<SkippedRow>,
}

impl CorpusRow {
    /// Normalise and validate a row into a corpus word.
    ///
    /// Text is trimmed and lower-cased, part of speech defaults to noun,
    /// complexity to medium, and a missing sentence is generated from the
    /// definition. Extra sentences beyond the limit are dropped.
    ///
    /// # Errors
    ///
    /// Returns `WordError` when the row cannot form a valid word.
    pub fn into_word(self, id: WordId) -> Result<Word, WordError> {
        let text = self.word.trim().to_lowercase();
        let definition = self.definition.trim().to_string();
        if text.is_empty() {
            return Err(WordError::EmptyText);
        }
        if definition.is_empty() {
            return Err(WordError::EmptyDefinition);
        }

        let part_of_speech = match self.part_of_speech.as_deref().map(str::trim) {
            None | Some("") => PartOfSpeech::Noun,
            Some(raw) => raw.parse()?,
        };
        let complexity = self
            .complexity
            .as_deref()
            .and_then(Complexity::from_label)
            .unwrap_or_default();

        let mut sentences: Vec<String> = self
            .sentences
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if sentences.is_empty() {
            sentences.push(format!("The word \"{text}\" means {definition}"));
        }
        sentences.truncate(MAX_SENTENCES);

        let letter = self
            .starting_letter
            .as_deref()
            .and_then(|s| s.trim().chars().next())
            .or_else(|| starting_letter_of(&text))
            .ok_or(WordError::EmptyText)?;

        Word::from_persisted(
            id,
            text,
            definition,
            part_of_speech,
            sentences,
            letter,
            complexity,
        )
    }
}

/// Parse corpus rows into words, continuing ids from `next_id`.
///
/// Duplicate texts keep their first occurrence.
pub fn parse_rows(rows: Vec<CorpusRow>, load: &mut CorpusLoad, next_id: &mut u64) {
    let mut seen: HashSet<String> = load.words.iter().map(|w| w.text().to_string()).collect();
    for row in rows {
        let label = row.word.trim().to_string();
        match row.into_word(WordId::new(*next_id)) {
            Ok(word) if seen.insert(word.text().to_string()) => {
                *next_id += 1;
                load.words.push(word);
            }
            Ok(word) => {
                warn!(word = word.text(), "skipping duplicate corpus word");
                load.skipped.push(SkippedRow {
                    word: label,
                    reason: SkipReason::Duplicate,
                });
            }
            Err(err) => {
                warn!(word = %label, error = %err, "skipping invalid corpus row");
                load.skipped.push(SkippedRow {
                    word: label,
                    reason: SkipReason::Invalid(err),
                });
            }
        }
    }
}

/// Parse a single corpus document held in memory.
///
/// # Errors
///
/// Returns `CorpusError::Json` if `json` is not a corpus document.
pub fn parse_corpus(json: &str) -> Result<CorpusLoad, CorpusError> {
    let file: CorpusFile = serde_json::from_str(json).map_err(|source| CorpusError::Json {
        path: PathBuf::from("<memory>"),
        source,
    })?;
    let mut load = CorpusLoad::default();
    let mut next_id = 1;
    parse_rows(file.words, &mut load, &mut next_id);
    Ok(load)
}

/// Load and concatenate corpus files in the given order.
///
/// # Errors
///
/// Returns `CorpusError` if any file cannot be read or parsed.
pub fn load_corpus<P: AsRef<Path>>(paths: &[P]) -> Result<CorpusLoad, CorpusError> {
    let mut load = CorpusLoad::default();
    let mut next_id = 1;
    for path in paths {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: CorpusFile = serde_json::from_str(&raw).map_err(|source| CorpusError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let before = load.words.len();
        parse_rows(file.words, &mut load, &mut next_id);
        info!(
            path = %path.display(),
            loaded = load.words.len() - before,
            "loaded corpus file"
        );
    }
    info!(
        total = load.words.len(),
        skipped = load.skipped.len(),
        "corpus ready"
    );
    Ok(load)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "words": [
            { "word": "Abase", "definition": "to lower in rank", "partOfSpeech": "verb",
              "sentences": ["He refused to abase himself."], "complexity": "Easy" },
            { "word": "quixotic", "definition": "idealistic", "partOfSpeech": "adjective",
              "sentences": [], "startingLetter": "q" },
            { "word": "", "definition": "blank" },
            { "word": "abase", "definition": "dupe" },
            { "word": "zealot", "definition": "a fanatic", "sentences": ["a", "b", "c"],
              "complexity": "3" }
        ]
    }"#;

    #[test]
    fn parses_rows_with_defaults() {
        let load = parse_corpus(SAMPLE).unwrap();
        assert_eq!(load.words.len(), 3);

        let abase = &load.words[0];
        assert_eq!(abase.id(), WordId::new(1));
        assert_eq!(abase.text(), "abase");
        assert_eq!(abase.complexity(), Complexity::Simple);
        assert_eq!(abase.part_of_speech(), PartOfSpeech::Verb);

        let quixotic = &load.words[1];
        assert_eq!(quixotic.id(), WordId::new(2));
        assert_eq!(quixotic.starting_letter(), 'Q');
        assert_eq!(quixotic.complexity(), Complexity::Medium);
        assert_eq!(
            quixotic.sentences(),
            ["The word \"quixotic\" means idealistic".to_string()]
        );

        let zealot = &load.words[2];
        assert_eq!(zealot.id(), WordId::new(3));
        assert_eq!(zealot.sentences().len(), 2);
        assert_eq!(zealot.part_of_speech(), PartOfSpeech::Noun);
        assert_eq!(zealot.complexity(), Complexity::High);
    }

    #[test]
    fn reports_skipped_rows() {
        let load = parse_corpus(SAMPLE).unwrap();
        assert_eq!(load.skipped.len(), 2);
        assert_eq!(
            load.skipped[0].reason,
            SkipReason::Invalid(WordError::EmptyText)
        );
        assert_eq!(load.skipped[1].reason, SkipReason::Duplicate);
    }

    #[test]
    fn loads_files_in_order_with_continuous_ids() {
        let mut first = tempfile::NamedTempFile::new().unwrap();
        write!(
            first,
            r#"{{"words":[{{"word":"abate","definition":"to lessen"}}]}}"#
        )
        .unwrap();
        let mut second = tempfile::NamedTempFile::new().unwrap();
        write!(
            second,
            r#"{{"words":[{{"word":"bolster","definition":"to support"}},{{"word":"abate","definition":"again"}}]}}"#
        )
        .unwrap();

        let load = load_corpus(&[first.path(), second.path()]).unwrap();
        let ids: Vec<_> = load.words.iter().map(|w| w.id().value()).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(load.skipped.len(), 1);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_corpus(&["/definitely/not/here.json"]).unwrap_err();
        assert!(matches!(err, CorpusError::Io { .. }));
    }
}
