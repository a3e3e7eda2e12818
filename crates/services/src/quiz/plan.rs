use rand::Rng;
use rand::seq::SliceRandom;
use rand::seq::index;

use vocab_core::model::{MIN_QUIZ_WORDS, OPTIONS_PER_QUESTION, Question, Word};

use crate::error::QuizError;

/// Words drawn for a quiz and the questions built from them, in draw order.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizPlan {
    pub words: Vec<Word>,
    pub questions: Vec<Question>,
}

impl QuizPlan {
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }
}

/// Draws quiz words from a filtered pool and builds four-option questions.
///
/// The pool is the corpus after letter/complexity filtering; distractors
/// come from the same pool.
pub struct QuizBuilder<'a> {
    pool: &'a [Word],
    requested: u32,
}

impl<'a> QuizBuilder<'a> {
    #[must_use]
    pub fn new(pool: &'a [Word], requested: u32) -> Self {
        Self { pool, requested }
    }

    /// `min(requested, |pool|)`.
    #[must_use]
    pub fn actual_count(&self) -> usize {
        usize::try_from(self.requested)
            .unwrap_or(usize::MAX)
            .min(self.pool.len())
    }

    /// Build the plan.
    ///
    /// Words are drawn uniformly without replacement via a Fisher-Yates
    /// shuffle; each question gets three distinct distractors sampled from the
    /// rest of the pool and its option order is shuffled the same way.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidRequest` for a zero request and
    /// `QuizError::InsufficientWords` when fewer than four words can be drawn.
    pub fn build<R: Rng + ?Sized>(self, rng: &mut R) -> Result<QuizPlan, QuizError> {
        if self.requested == 0 {
            return Err(QuizError::InvalidRequest(
                "requested word count must be positive".into(),
            ));
        }
        let actual = self.actual_count();
        if actual < MIN_QUIZ_WORDS {
            return Err(QuizError::InsufficientWords {
                available: self.pool.len(),
            });
        }

        let mut order: Vec<usize> = (0..self.pool.len()).collect();
        order.shuffle(rng);
        order.truncate(actual);

        let mut words = Vec::with_capacity(actual);
        let mut questions = Vec::with_capacity(actual);
        for idx in order {
            let word = &self.pool[idx];
            questions.push(self.question_for(idx, rng)?);
            words.push(word.clone());
        }

        Ok(QuizPlan { words, questions })
    }

    fn question_for<R: Rng + ?Sized>(&self, correct: usize, rng: &mut R) -> Result<Question, QuizError> {
        // sample from the pool with the correct word removed, then shift indices back
        let distractors = index::sample(rng, self.pool.len() - 1, OPTIONS_PER_QUESTION - 1);

        let mut options: [String; OPTIONS_PER_QUESTION] = Default::default();
        options[0] = self.pool[correct].text().to_string();
        for (slot, i) in options[1..].iter_mut().zip(distractors.iter()) {
            let i = if i >= correct { i + 1 } else { i };
            *slot = self.pool[i].text().to_string();
        }
        options.shuffle(rng);

        Ok(Question::new(&self.pool[correct], options)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::{HashMap, HashSet};
    use vocab_core::model::{Complexity, PartOfSpeech, WordId};

    fn pool(n: usize) -> Vec<Word> {
        (0..n)
            .map(|i| {
                Word::new(
                    WordId::new(i as u64 + 1),
                    format!("word{i:02}"),
                    format!("definition {i}"),
                    PartOfSpeech::Noun,
                    vec![format!("Sentence {i}.")],
                    Complexity::Medium,
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn draws_min_of_requested_and_pool() {
        let words = pool(6);
        let mut rng = StdRng::seed_from_u64(1);

        let plan = QuizBuilder::new(&words, 10).build(&mut rng).unwrap();
        assert_eq!(plan.total(), 6);

        let plan = QuizBuilder::new(&words, 4).build(&mut rng).unwrap();
        assert_eq!(plan.total(), 4);
        let ids: HashSet<_> = plan.words.iter().map(Word::id).collect();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn rejects_zero_and_small_pools() {
        let mut rng = StdRng::seed_from_u64(1);
        let words = pool(3);
        let err = QuizBuilder::new(&words, 10).build(&mut rng).unwrap_err();
        assert!(matches!(err, QuizError::InsufficientWords { available: 3 }));

        let words = pool(8);
        let err = QuizBuilder::new(&words, 3).build(&mut rng).unwrap_err();
        assert!(matches!(err, QuizError::InsufficientWords { available: 8 }));

        let err = QuizBuilder::new(&words, 0).build(&mut rng).unwrap_err();
        assert!(matches!(err, QuizError::InvalidRequest(_)));
    }

    #[test]
    fn every_question_has_four_distinct_options_with_the_answer() {
        let words = pool(4);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let plan = QuizBuilder::new(&words, 4).build(&mut rng).unwrap();
            for (word, q) in plan.words.iter().zip(&plan.questions) {
                assert_eq!(q.word_id, word.id());
                assert_eq!(q.correct_answer, word.text());
                let distinct: HashSet<_> = q.options.iter().collect();
                assert_eq!(distinct.len(), OPTIONS_PER_QUESTION);
                assert!(q.correct_index().is_some());
            }
        }
    }

    #[test]
    fn correct_answer_position_is_uniform() {
        let words = pool(12);
        let mut rng = StdRng::seed_from_u64(42);
        let mut positions = [0_u32; OPTIONS_PER_QUESTION];
        let trials = 1_000;
        for _ in 0..trials {
            let plan = QuizBuilder::new(&words, 4).build(&mut rng).unwrap();
            for q in &plan.questions {
                positions[q.correct_index().unwrap()] += 1;
            }
        }
        // 4000 samples, 1000 expected per slot
        for count in positions {
            assert!((850..=1150).contains(&count), "skewed positions: {positions:?}");
        }
    }

    #[test]
    fn draw_order_is_uniform() {
        let words = pool(5);
        let mut rng = StdRng::seed_from_u64(9);
        let mut first_drawn: HashMap<WordId, u32> = HashMap::new();
        let trials = 5_000;
        for _ in 0..trials {
            let plan = QuizBuilder::new(&words, 5).build(&mut rng).unwrap();
            *first_drawn.entry(plan.words[0].id()).or_default() += 1;
        }
        assert_eq!(first_drawn.len(), 5);
        // 1000 expected per word
        for count in first_drawn.values() {
            assert!((850..=1150).contains(count), "skewed draw: {first_drawn:?}");
        }
    }

    #[test]
    fn distractors_cover_the_whole_pool() {
        let words = pool(10);
        let mut rng = StdRng::seed_from_u64(5);
        let mut seen: HashMap<String, u32> = HashMap::new();
        for _ in 0..500 {
            let plan = QuizBuilder::new(&words, 4).build(&mut rng).unwrap();
            for q in &plan.questions {
                for option in q.options.iter().filter(|o| **o != q.correct_answer) {
                    *seen.entry(option.clone()).or_default() += 1;
                }
            }
        }
        assert_eq!(seen.len(), 10);
    }
}
