use std::collections::HashMap;
use std::io::{BufRead, Write};

use services::{AppServices, FlashcardDeck, QuizOutcome, StartQuizRequest};
use vocab_core::model::{Complexity, OPTIONS_PER_QUESTION, Question, UserId};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Per-run selection shared by the subcommands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub user_id: UserId,
    pub count: i64,
    pub letter: Option<char>,
    pub complexity: Option<Complexity>,
    pub page: u32,
}

/// Reads one line; `None` at end of input.
fn read_line(input: &mut impl BufRead) -> std::io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Maps a typed reply onto an option: `1`..`4` picks by position, anything
/// else is taken verbatim. Blank means no answer.
fn parse_choice(reply: &str, question: &Question) -> Option<String> {
    if reply.is_empty() {
        return None;
    }
    match reply.parse::<usize>() {
        Ok(n) if (1..=OPTIONS_PER_QUESTION).contains(&n) => Some(question.options[n - 1].clone()),
        _ => Some(reply.to_string()),
    }
}

pub async fn quiz(
    services: &AppServices,
    sel: &Selection,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> CmdResult {
    let quiz = services.quiz();
    let start = quiz
        .start_quiz(
            StartQuizRequest::new(sel.count)
                .with_user(sel.user_id)
                .with_letter(sel.letter)
                .with_complexity(sel.complexity),
        )
        .await?;

    let mut answers = HashMap::new();
    for (i, question) in start.questions.iter().enumerate() {
        writeln!(out)?;
        writeln!(
            out,
            "Question {}/{} ({})",
            i + 1,
            start.total_questions,
            question.part_of_speech.as_str()
        )?;
        writeln!(out, "  {}", question.definition)?;
        for (n, option) in question.options.iter().enumerate() {
            writeln!(out, "  {}) {option}", n + 1)?;
        }
        write!(out, "> ")?;
        out.flush()?;

        let Some(reply) = read_line(input)? else {
            break;
        };
        if let Some(answer) = parse_choice(&reply, question) {
            answers.insert(question.word_id, answer);
        }
    }

    let outcome = quiz.complete_quiz(start.session_id, &answers).await?;
    print_outcome(&outcome, out)?;
    Ok(())
}

fn print_outcome(outcome: &QuizOutcome, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "Score: {}/{} ({}%)",
        outcome.score.correct, outcome.total_questions, outcome.score.percentage
    )?;
    for item in &outcome.review {
        let mark = if item.is_correct { "ok " } else { "xx " };
        writeln!(out, "{mark} {} ({}): {}", item.word, item.part_of_speech.as_str(), item.definition)?;
        if !item.is_correct {
            writeln!(out, "    your answer: {}", item.user_answer)?;
        }
        if let Some(sentence) = item.sentences.first() {
            writeln!(out, "    e.g. {sentence}")?;
        }
    }
    Ok(())
}

fn render_card(deck: &FlashcardDeck, out: &mut impl Write) -> std::io::Result<()> {
    let Some(card) = deck.current() else {
        return Ok(());
    };
    writeln!(out)?;
    writeln!(out, "[{}/{}  {}%]", deck.index() + 1, deck.len(), deck.progress())?;
    if deck.is_flipped() {
        writeln!(out, "  {} ({})", card.definition(), card.part_of_speech().as_str())?;
        for sentence in card.sentences() {
            writeln!(out, "  - {sentence}")?;
        }
    } else {
        writeln!(out, "  {}", card.text())?;
    }
    write!(out, "(enter) flip  n) next  p) previous  s) shuffle  q) done > ")?;
    out.flush()
}

pub async fn flashcards(
    services: &AppServices,
    sel: &Selection,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> CmdResult {
    let flashcards = services.flashcards();
    let count = u32::try_from(sel.count).unwrap_or(0);
    let mut deck = flashcards.deal(count, sel.letter).await?;

    loop {
        render_card(&deck, out)?;
        let Some(reply) = read_line(input)? else {
            break;
        };
        match reply.as_str() {
            "" | "f" => deck.flip(),
            "n" => {
                if !deck.next() {
                    break;
                }
            }
            "p" => {
                deck.previous();
            }
            "s" => flashcards.shuffle(&mut deck),
            "q" => break,
            other => writeln!(out, "unknown key: {other}")?,
        }
    }

    let stats = flashcards.finish(sel.user_id, &deck).await?;
    writeln!(out)?;
    writeln!(
        out,
        "Reviewed {} cards. Flashcard sessions: {}, streak: {} day(s).",
        deck.len(),
        stats.total_flashcard_sessions,
        stats.current_streak
    )?;
    Ok(())
}

pub async fn stats(services: &AppServices, sel: &Selection, out: &mut impl Write) -> CmdResult {
    let progress = services.progress();
    let stats = progress.statistics(sel.user_id).await?;
    let learned = progress.words_learned(sel.user_id).await?;
    let letters = progress.all_letters_progress(sel.user_id).await?;

    writeln!(out, "Quizzes taken:      {}", stats.total_quizzes_taken)?;
    writeln!(out, "Flashcard sessions: {}", stats.total_flashcard_sessions)?;
    writeln!(out, "Words studied:      {}", stats.total_words_studied)?;
    writeln!(out, "Average score:      {}%", stats.average_score)?;
    writeln!(out, "Best score:         {}%", stats.best_score)?;
    writeln!(
        out,
        "Streak:             {} (longest {})",
        stats.current_streak, stats.longest_streak
    )?;
    if let Some(last) = stats.last_study_date {
        writeln!(out, "Last studied:       {}", last.format("%Y-%m-%d"))?;
    }

    let b = learned.breakdown;
    writeln!(out)?;
    writeln!(
        out,
        "Words learned: {} (learning {}, familiar {}, mastered {})",
        learned.total, b.learning, b.familiar, b.mastered
    )?;
    for letter in letters.iter().filter(|l| l.words_learned > 0) {
        writeln!(
            out,
            "  {}: {}/{} ({}%)",
            letter.letter, letter.words_learned, letter.total_words, letter.percentage
        )?;
    }
    Ok(())
}

pub async fn words(services: &AppServices, sel: &Selection, out: &mut impl Write) -> CmdResult {
    let corpus = services.corpus();
    let words = if sel.letter.is_some() || sel.complexity.is_some() {
        let words = corpus.filtered(sel.letter, sel.complexity).await?;
        writeln!(out, "{} matching words", words.len())?;
        words
    } else {
        let page = corpus.all(sel.page, 0).await?;
        writeln!(
            out,
            "Page {}/{} ({} words)",
            page.current_page, page.total_pages, page.total_words
        )?;
        page.words
    };

    for word in &words {
        writeln!(
            out,
            "{:>5}  {:<18} {:<12} {:<7} {}",
            word.id().value(),
            word.text(),
            word.part_of_speech().as_str(),
            word.complexity().as_str(),
            word.definition()
        )?;
    }

    let complexity = corpus.complexity_stats().await?;
    let summary: Vec<String> = complexity
        .iter()
        .map(|c| format!("{} {}", c.complexity.as_str(), c.count))
        .collect();
    writeln!(out, "Corpus by complexity: {}", summary.join(", "))?;
    Ok(())
}

pub async fn history(services: &AppServices, sel: &Selection, out: &mut impl Write) -> CmdResult {
    let page = services.quiz().history(sel.user_id, sel.page, 0).await?;
    writeln!(
        out,
        "Page {}/{} ({} completed quizzes)",
        page.current_page, page.total_pages, page.total_sessions
    )?;
    for session in &page.sessions {
        let (Some(score), Some(completed_at)) = (session.score(), session.completed_at()) else {
            continue;
        };
        let letter = session
            .letter_filter()
            .map_or_else(|| "-".to_string(), |c| c.to_string());
        writeln!(
            out,
            "{}  {:>3}%  {}/{}  letter {letter}  {}",
            completed_at.format("%Y-%m-%d %H:%M"),
            score.percentage,
            score.correct,
            session.word_count(),
            session.id()
        )?;
    }
    Ok(())
}
