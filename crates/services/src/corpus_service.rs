use std::sync::Arc;

use rand::seq::index;
use serde::Serialize;
use tracing::debug;

use storage::repository::WordRepository;
use vocab_core::model::{Complexity, Word, WordFilter, WordId};

use crate::error::CorpusServiceError;
use crate::rng::SharedRng;

/// Default page size for corpus listings.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordPage {
    pub words: Vec<Word>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_words: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LetterCount {
    pub letter: char,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComplexityCount {
    pub complexity: Complexity,
    pub count: u64,
}

/// Read-side queries over the word corpus.
#[derive(Clone)]
pub struct CorpusService {
    words: Arc<dyn WordRepository>,
    rng: SharedRng,
}

impl CorpusService {
    #[must_use]
    pub fn new(words: Arc<dyn WordRepository>) -> Self {
        Self {
            words,
            rng: SharedRng::from_entropy(),
        }
    }

    #[must_use]
    pub fn with_rng(mut self, rng: SharedRng) -> Self {
        self.rng = rng;
        self
    }

    /// One page of the whole corpus in id order. Pages start at 1.
    ///
    /// # Errors
    ///
    /// Returns `CorpusServiceError::Storage` for repository failures.
    pub async fn all(&self, page: u32, limit: u32) -> Result<WordPage, CorpusServiceError> {
        let page = page.max(1);
        let limit = if limit == 0 { DEFAULT_PAGE_LIMIT } else { limit };
        let skip = usize::try_from((page - 1).saturating_mul(limit)).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);

        let all = self.words.list_words(WordFilter::default()).await?;
        let total_words = all.len() as u64;
        let words = all.into_iter().skip(skip).take(take).collect();

        Ok(WordPage {
            words,
            current_page: page,
            total_pages: u32::try_from(total_words.div_ceil(u64::from(limit)))
                .unwrap_or(u32::MAX),
            total_words,
        })
    }

    /// # Errors
    ///
    /// Returns `CorpusServiceError::NotFound` for an unknown id.
    pub async fn by_id(&self, id: WordId) -> Result<Word, CorpusServiceError> {
        self.words
            .get_word(id)
            .await?
            .ok_or(CorpusServiceError::NotFound)
    }

    /// Words starting with `letter`, case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns `CorpusServiceError::Storage` for repository failures.
    pub async fn by_letter(&self, letter: char) -> Result<Vec<Word>, CorpusServiceError> {
        self.filtered(Some(letter), None).await
    }

    /// # Errors
    ///
    /// Returns `CorpusServiceError::Storage` for repository failures.
    pub async fn filtered(
        &self,
        letter: Option<char>,
        complexity: Option<Complexity>,
    ) -> Result<Vec<Word>, CorpusServiceError> {
        Ok(self
            .words
            .list_words(WordFilter::new(letter, complexity))
            .await?)
    }

    /// `count` distinct words sampled uniformly, optionally from one letter.
    ///
    /// # Errors
    ///
    /// Returns `CorpusServiceError::InvalidRequest` for a zero count and
    /// `CorpusServiceError::NotEnoughWords` when the pool is smaller than `count`.
    pub async fn random(
        &self,
        count: u32,
        letter: Option<char>,
    ) -> Result<Vec<Word>, CorpusServiceError> {
        if count == 0 {
            return Err(CorpusServiceError::InvalidRequest(
                "count must be positive".into(),
            ));
        }
        let pool = self
            .words
            .list_words(WordFilter::new(letter, None))
            .await?;
        let wanted = usize::try_from(count).unwrap_or(usize::MAX);
        if pool.len() < wanted {
            return Err(CorpusServiceError::NotEnoughWords {
                available: pool.len() as u64,
                requested: count,
            });
        }

        let picks = self.rng.with(|rng| index::sample(rng, pool.len(), wanted));
        debug!(count, letter = ?letter, pool = pool.len(), "sampled random words");
        Ok(picks.iter().map(|i| pool[i].clone()).collect())
    }

    /// # Errors
    ///
    /// Returns `CorpusServiceError::Storage` for repository failures.
    pub async fn count(&self, letter: Option<char>) -> Result<u64, CorpusServiceError> {
        Ok(self
            .words
            .count_words(WordFilter::new(letter, None))
            .await?)
    }

    /// Word count per starting letter, sorted by letter.
    ///
    /// # Errors
    ///
    /// Returns `CorpusServiceError::Storage` for repository failures.
    pub async fn letter_stats(&self) -> Result<Vec<LetterCount>, CorpusServiceError> {
        Ok(self
            .words
            .letter_counts()
            .await?
            .into_iter()
            .map(|b| LetterCount {
                letter: b.key,
                count: b.count,
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns `CorpusServiceError::Storage` for repository failures.
    pub async fn complexity_stats(&self) -> Result<Vec<ComplexityCount>, CorpusServiceError> {
        Ok(self
            .words
            .complexity_counts()
            .await?
            .into_iter()
            .map(|b| ComplexityCount {
                complexity: b.key,
                count: b.count,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use storage::repository::InMemoryRepository;
    use vocab_core::model::PartOfSpeech;

    fn corpus() -> Vec<Word> {
        ["abate", "abhor", "bland", "brisk", "candid", "cajole", "quell"]
            .iter()
            .enumerate()
            .map(|(i, text)| {
                Word::new(
                    WordId::new(i as u64 + 1),
                    *text,
                    format!("meaning of {text}"),
                    PartOfSpeech::Verb,
                    vec![format!("{text} in a sentence")],
                    if i % 2 == 0 { Complexity::Simple } else { Complexity::High },
                )
                .unwrap()
            })
            .collect()
    }

    fn service() -> CorpusService {
        CorpusService::new(Arc::new(InMemoryRepository::with_words(corpus()).unwrap()))
            .with_rng(SharedRng::seeded(11))
    }

    #[tokio::test]
    async fn pages_through_corpus() {
        let svc = service();
        let page = svc.all(2, 3).await.unwrap();
        assert_eq!(page.current_page, 2);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_words, 7);
        let texts: Vec<_> = page.words.iter().map(Word::text).collect();
        assert_eq!(texts, ["brisk", "candid", "cajole"]);

        let page = svc.all(0, 0).await.unwrap();
        assert_eq!(page.current_page, 1);
        assert_eq!(page.words.len(), 7);
    }

    #[tokio::test]
    async fn letter_queries_are_case_insensitive() {
        let svc = service();
        assert_eq!(svc.by_letter('b').await.unwrap().len(), 2);
        assert_eq!(svc.count(Some('C')).await.unwrap(), 2);
        assert_eq!(svc.count(None).await.unwrap(), 7);
        let simple_a = svc
            .filtered(Some('a'), Some(Complexity::Simple))
            .await
            .unwrap();
        assert_eq!(simple_a.len(), 1);
        assert_eq!(simple_a[0].text(), "abate");
    }

    #[tokio::test]
    async fn by_id_reports_missing_words() {
        let svc = service();
        assert_eq!(svc.by_id(WordId::new(7)).await.unwrap().text(), "quell");
        assert!(matches!(
            svc.by_id(WordId::new(70)).await.unwrap_err(),
            CorpusServiceError::NotFound
        ));
    }

    #[tokio::test]
    async fn random_draws_distinct_words_or_fails() {
        let svc = service();
        let words = svc.random(5, None).await.unwrap();
        let ids: HashSet<_> = words.iter().map(Word::id).collect();
        assert_eq!(ids.len(), 5);

        let err = svc.random(3, Some('q')).await.unwrap_err();
        assert!(matches!(
            err,
            CorpusServiceError::NotEnoughWords {
                available: 1,
                requested: 3
            }
        ));
        assert!(matches!(
            svc.random(0, None).await.unwrap_err(),
            CorpusServiceError::InvalidRequest(_)
        ));
    }

    #[tokio::test]
    async fn stats_cover_letters_and_complexity() {
        let svc = service();
        let letters = svc.letter_stats().await.unwrap();
        assert_eq!(letters.first(), Some(&LetterCount { letter: 'A', count: 2 }));
        assert_eq!(letters.last(), Some(&LetterCount { letter: 'Q', count: 1 }));

        let complexity = svc.complexity_stats().await.unwrap();
        assert_eq!(complexity.len(), 3);
        assert_eq!(complexity[1].count, 0);
        assert_eq!(complexity[0].count + complexity[2].count, 7);
    }
}
