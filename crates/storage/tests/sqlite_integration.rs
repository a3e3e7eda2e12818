use std::collections::HashMap;

use chrono::Duration;
use storage::corpus::parse_corpus;
use storage::repository::{
    BucketCount, CorpusSync, ProgressRepository, QuizSessionRepository, StorageError,
    WordRepository,
};
use storage::sqlite::SqliteRepository;
use vocab_core::model::{
    Complexity, MasteryLevel, QuizMode, QuizSession, SessionId, UserId, Word, WordFilter, WordId,
};
use vocab_core::time::fixed_now;

const CORPUS: &str = r#"{
    "words": [
        { "word": "quell", "definition": "to suppress", "partOfSpeech": "verb",
          "sentences": ["Police quelled the riot."], "complexity": "medium" },
        { "word": "quaint", "definition": "attractively old-fashioned", "partOfSpeech": "adjective",
          "sentences": ["A quaint village."], "complexity": "simple" },
        { "word": "quandary", "definition": "a state of uncertainty",
          "sentences": ["She was in a quandary."], "complexity": "high" },
        { "word": "querulous", "definition": "complaining", "partOfSpeech": "adjective",
          "sentences": ["A querulous voice."], "complexity": "high" },
        { "word": "ravenous", "definition": "extremely hungry", "partOfSpeech": "adjective",
          "sentences": ["I was ravenous."], "complexity": "medium" }
    ]
}"#;

async fn repo(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn corpus() -> Vec<Word> {
    parse_corpus(CORPUS).expect("corpus").words
}

fn start(words: &[Word]) -> QuizSession {
    QuizSession::start(
        SessionId::generate(),
        UserId::LOCAL,
        QuizMode::Quiz,
        4,
        WordFilter::new(Some('q'), None),
        words,
        fixed_now(),
    )
    .unwrap()
}

#[tokio::test]
async fn words_roundtrip_and_filter() {
    let repo = repo("memdb_words").await;
    let words = corpus();
    repo.upsert_words(&words).await.unwrap();
    // upsert is idempotent by id
    repo.upsert_words(&words).await.unwrap();

    let fetched = repo.get_word(WordId::new(3)).await.unwrap().unwrap();
    assert_eq!(fetched, words[2]);
    assert!(repo.get_word(WordId::new(99)).await.unwrap().is_none());

    let q_words = repo
        .list_words(WordFilter::new(Some('q'), None))
        .await
        .unwrap();
    assert_eq!(q_words.len(), 4);
    assert!(q_words.iter().all(|w| w.starting_letter() == 'Q'));

    let q_high = repo
        .count_words(WordFilter::new(Some('Q'), Some(Complexity::High)))
        .await
        .unwrap();
    assert_eq!(q_high, 2);

    assert_eq!(
        repo.letter_counts().await.unwrap(),
        vec![
            BucketCount { key: 'Q', count: 4 },
            BucketCount { key: 'R', count: 1 },
        ]
    );
    let complexity = repo.complexity_counts().await.unwrap();
    assert_eq!(
        complexity
            .iter()
            .map(|b| (b.key, b.count))
            .collect::<Vec<_>>(),
        vec![
            (Complexity::Simple, 1),
            (Complexity::Medium, 2),
            (Complexity::High, 2),
        ]
    );
}

#[tokio::test]
async fn duplicate_word_text_conflicts() {
    let repo = repo("memdb_dup_words").await;
    let words = corpus();
    repo.upsert_words(&words).await.unwrap();

    let clash = Word::new(
        WordId::new(50),
        "quell",
        "again",
        words[0].part_of_speech(),
        vec!["x".into()],
        Complexity::Simple,
    )
    .unwrap();
    let err = repo.upsert_words(&[clash]).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
    assert_eq!(repo.count_words(WordFilter::default()).await.unwrap(), 5);
}

#[tokio::test]
async fn session_completion_is_single_shot() {
    let repo = repo("memdb_sessions").await;
    let words = corpus();
    repo.upsert_words(&words).await.unwrap();

    let session = start(&words[..4]);
    repo.insert_session(&session).await.unwrap();
    let stored = repo.get_session(session.id()).await.unwrap().unwrap();
    assert_eq!(stored, session);
    assert_eq!(stored.letter_filter(), Some('Q'));

    let mut answers = HashMap::new();
    answers.insert(WordId::new(1), "quell".to_string());
    answers.insert(WordId::new(2), "quaint".to_string());
    answers.insert(WordId::new(3), "quell".to_string());
    let graded = session
        .grade(&answers, fixed_now() + Duration::minutes(3))
        .unwrap();
    assert_eq!(graded.score.percentage, 50);

    let stats = repo.complete_session(&graded).await.unwrap();
    assert_eq!(stats.total_quizzes_taken, 1);
    assert_eq!(stats.total_words_studied, 4);
    assert_eq!(stats.best_score, 50);

    let err = repo.complete_session(&graded).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
    let stats = repo.get_statistics(UserId::LOCAL).await.unwrap();
    assert_eq!(stats.total_quizzes_taken, 1);

    let completed = repo.get_session(session.id()).await.unwrap().unwrap();
    assert!(completed.is_completed());
    assert_eq!(completed.score(), Some(graded.score));
    assert_eq!(completed.entries()[2].user_answer.as_deref(), Some("quell"));
    assert_eq!(completed.entries()[3].user_answer, None);

    let progress = repo.list_word_progress(UserId::LOCAL).await.unwrap();
    assert_eq!(progress.len(), 4);
    assert_eq!(progress[0].times_correct, 1);
    assert_eq!(progress[2].times_incorrect, 1);
    assert_eq!(progress[0].mastery(), MasteryLevel::Learning);
}

#[tokio::test]
async fn completing_unknown_session_is_not_found() {
    let repo = repo("memdb_unknown_session").await;
    let words = corpus();
    let graded = start(&words[..4])
        .grade(&HashMap::new(), fixed_now())
        .unwrap();
    let err = repo.complete_session(&graded).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn history_is_newest_first_and_paged() {
    let repo = repo("memdb_history").await;
    let words = corpus();

    for offset in 0..3 {
        let session = start(&words[..4]);
        repo.insert_session(&session).await.unwrap();
        let graded = session
            .grade(&HashMap::new(), fixed_now() + Duration::hours(offset))
            .unwrap();
        repo.complete_session(&graded).await.unwrap();
    }
    // an open session never shows up in history
    repo.insert_session(&start(&words[..4])).await.unwrap();

    assert_eq!(repo.count_completed_sessions(UserId::LOCAL).await.unwrap(), 3);

    let first_page = repo
        .list_completed_sessions(UserId::LOCAL, 0, 2)
        .await
        .unwrap();
    assert_eq!(first_page.len(), 2);
    assert!(first_page[0].completed_at() > first_page[1].completed_at());

    let second_page = repo
        .list_completed_sessions(UserId::LOCAL, 2, 2)
        .await
        .unwrap();
    assert_eq!(second_page.len(), 1);
    assert_eq!(second_page[0].completed_at(), Some(fixed_now()));
}

#[tokio::test]
async fn flashcard_sessions_update_statistics() {
    let repo = repo("memdb_flashcards").await;
    let stats = repo
        .record_flashcard_session(UserId::LOCAL, 10, fixed_now())
        .await
        .unwrap();
    assert_eq!(stats.total_flashcard_sessions, 1);
    assert_eq!(stats.total_words_studied, 10);
    assert_eq!(stats.current_streak, 1);

    let stats = repo
        .record_flashcard_session(UserId::LOCAL, 5, fixed_now() + Duration::days(1))
        .await
        .unwrap();
    assert_eq!(stats.current_streak, 2);
    assert_eq!(repo.get_statistics(UserId::LOCAL).await.unwrap(), stats);
}

/// Builds a corpus file the way an editor would leave it: ids are positional.
fn edition(texts: &[&str]) -> Vec<Word> {
    let entries: Vec<String> = texts
        .iter()
        .map(|t| {
            format!(
                r#"{{ "word": "{t}", "definition": "meaning of {t}", "partOfSpeech": "verb",
                      "sentences": ["They {t} it."], "complexity": "simple" }}"#
            )
        })
        .collect();
    parse_corpus(&format!(r#"{{ "words": [{}] }}"#, entries.join(",")))
        .expect("corpus")
        .words
}

async fn ids_by_text(repo: &SqliteRepository) -> Vec<(String, u64)> {
    repo.list_words(WordFilter::default())
        .await
        .unwrap()
        .iter()
        .map(|w| (w.text().to_string(), w.id().value()))
        .collect()
}

#[tokio::test]
async fn reseeding_matches_words_by_text() {
    let repo = repo("memdb_reseed").await;
    let first = repo
        .sync_words(&edition(&["aardvark", "abase", "abate", "abet"]))
        .await
        .unwrap();
    assert_eq!(first, CorpusSync { inserted: 4, updated: 0, removed: 0 });

    let words = repo.list_words(WordFilter::default()).await.unwrap();
    let session = QuizSession::start(
        SessionId::generate(),
        UserId::LOCAL,
        QuizMode::Quiz,
        4,
        WordFilter::new(Some('a'), None),
        &words,
        fixed_now(),
    )
    .unwrap();
    repo.insert_session(&session).await.unwrap();
    let mut answers = HashMap::new();
    answers.insert(WordId::new(3), "abate".to_string());
    let graded = session.grade(&answers, fixed_now()).unwrap();
    repo.complete_session(&graded).await.unwrap();

    // dropping the first word used to collide on the text column
    let second = repo
        .sync_words(&edition(&["abase", "abate", "abet"]))
        .await
        .unwrap();
    assert_eq!(second, CorpusSync { inserted: 0, updated: 3, removed: 1 });
    assert!(repo.get_word(WordId::new(1)).await.unwrap().is_none());
    assert_eq!(
        ids_by_text(&repo).await,
        [("abase".to_string(), 2), ("abate".to_string(), 3), ("abet".to_string(), 4)]
    );
    let progress = repo.list_word_progress(UserId::LOCAL).await.unwrap();
    let ids: Vec<u64> = progress.iter().map(|p| p.word_id.value()).collect();
    assert_eq!(ids, [2, 3, 4]);

    // inserting at the top must not shift progress onto other words
    let third = repo
        .sync_words(&edition(&["aardwolf", "abase", "abate", "abet"]))
        .await
        .unwrap();
    assert_eq!(third, CorpusSync { inserted: 1, updated: 3, removed: 0 });
    let aardwolf = repo.get_word(WordId::new(5)).await.unwrap().unwrap();
    assert_eq!(aardwolf.text(), "aardwolf");

    let progress = repo.list_word_progress(UserId::LOCAL).await.unwrap();
    assert_eq!(progress.len(), 3);
    let abate = progress.iter().find(|p| p.word_id == WordId::new(3)).unwrap();
    assert_eq!((abate.times_correct, abate.times_incorrect), (1, 0));
    let abase = progress.iter().find(|p| p.word_id == WordId::new(2)).unwrap();
    assert_eq!((abase.times_correct, abase.times_incorrect), (0, 1));
}

#[tokio::test]
async fn sync_with_repeated_text_rolls_back() {
    let repo = repo("memdb_reseed_dup").await;
    repo.sync_words(&corpus()).await.unwrap();

    let abase = edition(&["abase"]).remove(0);
    let again = abase.clone().with_id(WordId::new(2));
    let err = repo.sync_words(&[abase, again]).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
    assert_eq!(repo.count_words(WordFilter::default()).await.unwrap(), 5);
}
