use rand::seq::SliceRandom;
use serde::Serialize;

use vocab_core::model::{UserId, Word};

use crate::corpus_service::CorpusService;
use crate::error::ProgressServiceError;
use crate::progress_service::{ProgressService, StatisticsView};
use crate::rng::SharedRng;

/// A stack of word cards with a cursor and a flipped flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardDeck {
    cards: Vec<Word>,
    index: usize,
    flipped: bool,
}

impl FlashcardDeck {
    #[must_use]
    pub fn new(cards: Vec<Word>) -> Self {
        Self {
            cards,
            index: 0,
            flipped: false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    #[must_use]
    pub fn cards(&self) -> &[Word] {
        &self.cards
    }

    #[must_use]
    pub fn current(&self) -> Option<&Word> {
        self.cards.get(self.index)
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn flip(&mut self) {
        self.flipped = !self.flipped;
    }

    /// Advance one card. Returns `false` at the last card.
    pub fn next(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.index += 1;
        self.flipped = false;
        true
    }

    /// Step back one card. Returns `false` at the first card.
    pub fn previous(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.index -= 1;
        self.flipped = false;
        true
    }

    /// Reorder the cards uniformly and return to the first one.
    pub fn shuffle(&mut self, rng: &SharedRng) {
        rng.with(|rng| self.cards.shuffle(rng));
        self.index = 0;
        self.flipped = false;
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.cards.len()
    }

    /// Position through the deck as a rounded percentage.
    #[must_use]
    pub fn progress(&self) -> u32 {
        let len = self.cards.len();
        if len == 0 {
            return 0;
        }
        let seen = self.index + 1;
        u32::try_from((seen * 200 + len) / (2 * len)).unwrap_or(100)
    }
}

/// Deals flashcard decks and records finished passes.
#[derive(Clone)]
pub struct FlashcardService {
    corpus: CorpusService,
    progress: ProgressService,
    rng: SharedRng,
}

impl FlashcardService {
    #[must_use]
    pub fn new(corpus: CorpusService, progress: ProgressService, rng: SharedRng) -> Self {
        Self {
            corpus,
            progress,
            rng,
        }
    }

    /// Deal `count` random words, optionally from one letter.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Corpus` when the corpus cannot supply
    /// `count` words.
    pub async fn deal(
        &self,
        count: u32,
        letter: Option<char>,
    ) -> Result<FlashcardDeck, ProgressServiceError> {
        let cards = self.corpus.random(count, letter).await?;
        Ok(FlashcardDeck::new(cards))
    }

    pub fn shuffle(&self, deck: &mut FlashcardDeck) {
        deck.shuffle(&self.rng);
    }

    /// Record the deck as one flashcard session.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::EmptyDeck` for an empty deck.
    pub async fn finish(
        &self,
        user_id: UserId,
        deck: &FlashcardDeck,
    ) -> Result<StatisticsView, ProgressServiceError> {
        self.progress.record_flashcards(user_id, deck.len()).await
    }
}
