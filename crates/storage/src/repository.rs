use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use vocab_core::model::{
    Complexity, GradedQuiz, QuizSession, SessionId, UserId, UserStatistics, Word, WordFilter,
    WordId, WordProgress,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// What a corpus sync changed, keyed by word text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorpusSync {
    /// Texts the store had not seen; they received fresh ids.
    pub inserted: usize,
    /// Texts already stored; they kept their id and had their fields refreshed.
    pub updated: usize,
    /// Stored words missing from the import, deleted with their progress rows.
    pub removed: usize,
}

/// Number of corpus words per bucket, for setup screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketCount<K> {
    pub key: K,
    pub count: u64,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Read access to the word corpus, plus bulk loading at startup.
#[async_trait]
pub trait WordRepository: Send + Sync {
    /// Insert or replace corpus words by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a word's text is already used by another id.
    async fn upsert_words(&self, words: &[Word]) -> Result<(), StorageError>;

    /// Make the stored corpus equal to `words`, matching rows by text.
    ///
    /// Incoming ids are ignored. A known text keeps its stored id; a new text
    /// gets the next id after the current maximum. Stored words absent from
    /// `words` are deleted together with every user's progress on them.
    /// Sessions keep their own word snapshots and are left alone.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if `words` repeats a text; nothing is
    /// written in that case.
    async fn sync_words(&self, words: &[Word]) -> Result<CorpusSync, StorageError>;

    /// Fetch a word by id. `Ok(None)` when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_word(&self, id: WordId) -> Result<Option<Word>, StorageError>;

    /// All words passing `filter`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_words(&self, filter: WordFilter) -> Result<Vec<Word>, StorageError>;

    /// Number of words passing `filter`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn count_words(&self, filter: WordFilter) -> Result<u64, StorageError>;

    /// Word counts per starting letter, sorted by letter.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn letter_counts(&self) -> Result<Vec<BucketCount<char>>, StorageError>;

    /// Word counts per complexity tag, in `Complexity::ALL` order. Empty tags report zero.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn complexity_counts(&self) -> Result<Vec<BucketCount<Complexity>>, StorageError>;
}

/// Quiz session persistence.
#[async_trait]
pub trait QuizSessionRepository: Send + Sync {
    /// Store a freshly started session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id is already taken.
    async fn insert_session(&self, session: &QuizSession) -> Result<(), StorageError>;

    /// Fetch a session by id. `Ok(None)` when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_session(&self, id: SessionId) -> Result<Option<QuizSession>, StorageError>;

    /// Mark a session completed and fold its result into the owner's progress.
    ///
    /// The completion flag is checked and set together with the statistics and
    /// per-word updates: either all of them land or none do.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown session and
    /// `StorageError::Conflict` if it was already completed.
    async fn complete_session(&self, graded: &GradedQuiz) -> Result<UserStatistics, StorageError>;

    /// Completed sessions for a user, newest completion first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_completed_sessions(
        &self,
        user_id: UserId,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<QuizSession>, StorageError>;

    /// Number of completed sessions for a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn count_completed_sessions(&self, user_id: UserId) -> Result<u64, StorageError>;
}

/// Per-user aggregate statistics and per-word progress.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Statistics for a user; a fresh default when nothing was recorded yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_statistics(&self, user_id: UserId) -> Result<UserStatistics, StorageError>;

    /// Every word the user has answered at least once, ordered by word id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_word_progress(&self, user_id: UserId) -> Result<Vec<WordProgress>, StorageError>;

    /// Count a finished flashcard pass.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn record_flashcard_session(
        &self,
        user_id: UserId,
        word_count: u32,
        at: DateTime<Utc>,
    ) -> Result<UserStatistics, StorageError>;
}

/// Applies a graded quiz to statistics and per-word progress.
///
/// Shared by every backend so the aggregation rules live in one place.
/// `progress` only needs to hold the user's existing rows for the quizzed words.
pub(crate) fn fold_graded(
    stats: &mut UserStatistics,
    progress: &mut BTreeMap<WordId, WordProgress>,
    graded: &GradedQuiz,
) {
    stats.record_quiz(graded.score.percentage, graded.word_count(), graded.completed_at);
    for entry in &graded.entries {
        progress
            .entry(entry.word_id)
            .or_insert_with(|| WordProgress::new(entry.word_id))
            .record(entry.is_correct.unwrap_or(false), graded.completed_at);
    }
}

/// Ids and row changes for one corpus sync.
pub(crate) struct SyncPlan {
    /// Incoming words carrying their resolved ids, in import order.
    pub words: Vec<Word>,
    /// Stored ids whose text is no longer in the corpus.
    pub removed: Vec<WordId>,
    pub summary: CorpusSync,
}

/// Resolves incoming words against the stored `(id, text)` pairs.
///
/// Shared by every backend so id assignment is identical across them.
pub(crate) fn plan_sync(
    stored: &[(WordId, String)],
    incoming: &[Word],
) -> Result<SyncPlan, StorageError> {
    let known: HashMap<&str, WordId> = stored.iter().map(|(id, t)| (t.as_str(), *id)).collect();
    let mut next = stored.iter().map(|(id, _)| id.value()).max().unwrap_or(0) + 1;

    let mut seen: HashSet<&str> = HashSet::with_capacity(incoming.len());
    let mut words = Vec::with_capacity(incoming.len());
    let mut summary = CorpusSync::default();
    for word in incoming {
        if !seen.insert(word.text()) {
            return Err(StorageError::Conflict);
        }
        let id = if let Some(id) = known.get(word.text()) {
            summary.updated += 1;
            *id
        } else {
            let id = WordId::new(next);
            next += 1;
            summary.inserted += 1;
            id
        };
        words.push(word.clone().with_id(id));
    }

    let removed: Vec<WordId> = stored
        .iter()
        .filter(|(_, text)| !seen.contains(text.as_str()))
        .map(|(id, _)| *id)
        .collect();
    summary.removed = removed.len();

    Ok(SyncPlan {
        words,
        removed,
        summary,
    })
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    m.lock().map_err(|e| StorageError::Connection(e.to_string()))
}

/// Inserts or replaces by id, refusing a text already held by another id.
fn insert_word(words: &mut BTreeMap<WordId, Word>, word: Word) -> Result<(), StorageError> {
    let taken = words
        .values()
        .any(|w| w.text() == word.text() && w.id() != word.id());
    if taken {
        return Err(StorageError::Conflict);
    }
    words.insert(word.id(), word);
    Ok(())
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    words: Arc<Mutex<BTreeMap<WordId, Word>>>,
    sessions: Arc<Mutex<HashMap<SessionId, QuizSession>>>,
    statistics: Arc<Mutex<HashMap<UserId, UserStatistics>>>,
    word_progress: Arc<Mutex<HashMap<UserId, BTreeMap<WordId, WordProgress>>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-populated with a corpus.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if two words share a text, the same
    /// rule [`WordRepository::upsert_words`] enforces.
    pub fn with_words(words: impl IntoIterator<Item = Word>) -> Result<Self, StorageError> {
        let repo = Self::new();
        {
            let mut guard = lock(&repo.words)?;
            for word in words {
                insert_word(&mut guard, word)?;
            }
        }
        Ok(repo)
    }
}

#[async_trait]
impl WordRepository for InMemoryRepository {
    async fn upsert_words(&self, words: &[Word]) -> Result<(), StorageError> {
        let mut guard = lock(&self.words)?;
        for word in words {
            insert_word(&mut guard, word.clone())?;
        }
        Ok(())
    }

    async fn sync_words(&self, words: &[Word]) -> Result<CorpusSync, StorageError> {
        // lock order: words, word_progress
        let mut guard = lock(&self.words)?;
        let stored: Vec<(WordId, String)> = guard
            .values()
            .map(|w| (w.id(), w.text().to_string()))
            .collect();
        let plan = plan_sync(&stored, words)?;

        let mut word_progress = lock(&self.word_progress)?;
        for id in &plan.removed {
            guard.remove(id);
            for rows in word_progress.values_mut() {
                rows.remove(id);
            }
        }
        for word in plan.words {
            guard.insert(word.id(), word);
        }
        Ok(plan.summary)
    }

    async fn get_word(&self, id: WordId) -> Result<Option<Word>, StorageError> {
        Ok(lock(&self.words)?.get(&id).cloned())
    }

    async fn list_words(&self, filter: WordFilter) -> Result<Vec<Word>, StorageError> {
        Ok(lock(&self.words)?
            .values()
            .filter(|w| filter.matches(w))
            .cloned()
            .collect())
    }

    async fn count_words(&self, filter: WordFilter) -> Result<u64, StorageError> {
        let n = lock(&self.words)?.values().filter(|w| filter.matches(w)).count();
        Ok(n as u64)
    }

    async fn letter_counts(&self) -> Result<Vec<BucketCount<char>>, StorageError> {
        let mut counts: BTreeMap<char, u64> = BTreeMap::new();
        for word in lock(&self.words)?.values() {
            *counts.entry(word.starting_letter()).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(key, count)| BucketCount { key, count })
            .collect())
    }

    async fn complexity_counts(&self) -> Result<Vec<BucketCount<Complexity>>, StorageError> {
        let guard = lock(&self.words)?;
        Ok(Complexity::ALL
            .into_iter()
            .map(|key| BucketCount {
                key,
                count: guard.values().filter(|w| w.complexity() == key).count() as u64,
            })
            .collect())
    }
}

#[async_trait]
impl QuizSessionRepository for InMemoryRepository {
    async fn insert_session(&self, session: &QuizSession) -> Result<(), StorageError> {
        let mut guard = lock(&self.sessions)?;
        if guard.contains_key(&session.id()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(session.id(), session.clone());
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<QuizSession>, StorageError> {
        Ok(lock(&self.sessions)?.get(&id).cloned())
    }

    async fn complete_session(&self, graded: &GradedQuiz) -> Result<UserStatistics, StorageError> {
        // lock order: sessions, statistics, word_progress
        let mut sessions = lock(&self.sessions)?;
        let session = sessions
            .get_mut(&graded.session_id)
            .ok_or(StorageError::NotFound)?;
        if session.is_completed() {
            return Err(StorageError::Conflict);
        }

        let mut statistics = lock(&self.statistics)?;
        let mut word_progress = lock(&self.word_progress)?;

        let mut stats = statistics.get(&graded.user_id).cloned().unwrap_or_default();
        let mut progress = word_progress.get(&graded.user_id).cloned().unwrap_or_default();
        fold_graded(&mut stats, &mut progress, graded);

        session
            .complete(graded)
            .map_err(|_| StorageError::Conflict)?;
        statistics.insert(graded.user_id, stats.clone());
        word_progress.insert(graded.user_id, progress);
        Ok(stats)
    }

    async fn list_completed_sessions(
        &self,
        user_id: UserId,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<QuizSession>, StorageError> {
        let guard = lock(&self.sessions)?;
        let mut completed: Vec<&QuizSession> = guard
            .values()
            .filter(|s| s.user_id() == user_id && s.is_completed())
            .collect();
        completed.sort_by(|a, b| {
            b.completed_at()
                .cmp(&a.completed_at())
                .then_with(|| b.created_at().cmp(&a.created_at()))
        });
        Ok(completed
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count_completed_sessions(&self, user_id: UserId) -> Result<u64, StorageError> {
        let n = lock(&self.sessions)?
            .values()
            .filter(|s| s.user_id() == user_id && s.is_completed())
            .count();
        Ok(n as u64)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_statistics(&self, user_id: UserId) -> Result<UserStatistics, StorageError> {
        Ok(lock(&self.statistics)?
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_word_progress(&self, user_id: UserId) -> Result<Vec<WordProgress>, StorageError> {
        Ok(lock(&self.word_progress)?
            .get(&user_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn record_flashcard_session(
        &self,
        user_id: UserId,
        word_count: u32,
        at: DateTime<Utc>,
    ) -> Result<UserStatistics, StorageError> {
        let mut guard = lock(&self.statistics)?;
        let stats = guard.entry(user_id).or_default();
        stats.record_flashcards(word_count, at);
        Ok(stats.clone())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub words: Arc<dyn WordRepository>,
    pub sessions: Arc<dyn QuizSessionRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    fn from_repository<R>(repo: R) -> Self
    where
        R: WordRepository + QuizSessionRepository + ProgressRepository + Clone + 'static,
    {
        let words: Arc<dyn WordRepository> = Arc::new(repo.clone());
        let sessions: Arc<dyn QuizSessionRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self {
            words,
            sessions,
            progress,
        }
    }

    /// In-memory storage seeded with `words`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if two words share a text.
    pub fn in_memory_with_words(
        words: impl IntoIterator<Item = Word>,
    ) -> Result<Self, StorageError> {
        Ok(Self::from_repository(InMemoryRepository::with_words(words)?))
    }
}
