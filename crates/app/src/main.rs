mod commands;

use std::fmt;
use std::path::PathBuf;

use services::{AppServices, Clock};
use storage::corpus::load_corpus;
use storage::repository::Storage;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vocab_core::model::{Complexity, UserId};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    InvalidLetter { raw: String },
    InvalidComplexity { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidLetter { raw } => write!(f, "invalid --letter value: {raw}"),
            ArgsError::InvalidComplexity { raw } => {
                write!(f, "invalid --complexity value: {raw} (simple, medium, high)")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(raw: String, flag: &'static str) -> Result<T, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

fn parse_letter(raw: String) -> Result<char, ArgsError> {
    let mut chars = raw.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_alphabetic() => Ok(c),
        _ => Err(ArgsError::InvalidLetter { raw }),
    }
}

fn split_paths(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DbTarget {
    Memory,
    Sqlite(String),
}

impl DbTarget {
    fn parse(raw: String) -> Result<Self, ArgsError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ArgsError::InvalidDbUrl { raw });
        }
        if trimmed == "memory" {
            return Ok(Self::Memory);
        }
        Ok(Self::Sqlite(normalize_sqlite_url(trimmed)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Quiz,
    Flashcards,
    Stats,
    Words,
    History,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "quiz" => Some(Self::Quiz),
            "flashcards" => Some(Self::Flashcards),
            "stats" => Some(Self::Stats),
            "words" => Some(Self::Words),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    db: DbTarget,
    corpus: Vec<PathBuf>,
    user_id: UserId,
    seed: Option<u64>,
    count: i64,
    letter: Option<char>,
    complexity: Option<Complexity>,
    page: u32,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            db: DbTarget::Sqlite(normalize_sqlite_url("sqlite://vocab.sqlite3")),
            corpus: Vec::new(),
            user_id: UserId::LOCAL,
            seed: None,
            count: 10,
            letter: None,
            complexity: None,
            page: 1,
        }
    }
}

impl Args {
    /// Environment first, then flags on top.
    fn parse(
        env: impl Fn(&str) -> Option<String>,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();
        if let Some(raw) = env("VOCAB_DB_URL") {
            parsed.db = DbTarget::parse(raw)?;
        }
        if let Some(raw) = env("VOCAB_CORPUS") {
            parsed.corpus = split_paths(&raw);
        }
        if let Some(raw) = env("VOCAB_USER_ID") {
            parsed.user_id = UserId::new(parse_number(raw, "VOCAB_USER_ID")?);
        }
        if let Some(raw) = env("VOCAB_SEED") {
            parsed.seed = Some(parse_number(raw, "VOCAB_SEED")?);
        }

        let mut corpus_from_flags = false;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => parsed.db = DbTarget::parse(require_value(args, "--db")?)?,
                "--corpus" => {
                    let value = require_value(args, "--corpus")?;
                    if !corpus_from_flags {
                        parsed.corpus.clear();
                        corpus_from_flags = true;
                    }
                    parsed.corpus.extend(split_paths(&value));
                }
                "--user" => {
                    parsed.user_id = UserId::new(parse_number(require_value(args, "--user")?, "--user")?);
                }
                "--seed" => {
                    parsed.seed = Some(parse_number(require_value(args, "--seed")?, "--seed")?);
                }
                "--count" | "-n" => {
                    parsed.count = parse_number(require_value(args, "--count")?, "--count")?;
                }
                "--letter" => parsed.letter = Some(parse_letter(require_value(args, "--letter")?)?),
                "--complexity" => {
                    let raw = require_value(args, "--complexity")?;
                    let complexity = Complexity::from_label(&raw)
                        .ok_or(ArgsError::InvalidComplexity { raw })?;
                    parsed.complexity = Some(complexity);
                }
                "--page" => parsed.page = parse_number(require_value(args, "--page")?, "--page")?,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  quiz        multiple-choice quiz (--count, --letter, --complexity)");
    eprintln!("  flashcards  flip through random cards (--count, --letter)");
    eprintln!("  stats       learner statistics and per-letter progress");
    eprintln!("  words       corpus listing (--page, --letter, --complexity)");
    eprintln!("  history     completed quizzes, newest first (--page)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url|memory>   default sqlite://vocab.sqlite3");
    eprintln!("  --corpus <file.json>       repeatable; required with --db memory");
    eprintln!("  --user <id>                default 1");
    eprintln!("  --seed <u64>               deterministic quizzes and decks");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  VOCAB_DB_URL, VOCAB_CORPUS, VOCAB_USER_ID, VOCAB_SEED, VOCAB_LOG");
}

fn normalize_sqlite_url(raw: &str) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.starts_with("sqlite:file:") {
        return raw.to_string();
    }

    let path_str = raw.strip_prefix("sqlite:").unwrap_or(raw);
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("VOCAB_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn open_services(args: &Args) -> Result<AppServices, Box<dyn std::error::Error>> {
    let storage = match &args.db {
        DbTarget::Memory => Storage::in_memory(),
        DbTarget::Sqlite(url) => Storage::sqlite(url).await?,
    };

    if !args.corpus.is_empty() {
        let load = load_corpus(args.corpus.as_slice())?;
        let sync = storage.words.sync_words(&load.words).await?;
        info!(
            words = load.words.len(),
            skipped = load.skipped.len(),
            inserted = sync.inserted,
            updated = sync.updated,
            removed = sync.removed,
            "corpus imported"
        );
    }

    Ok(AppServices::from_storage(&storage, Clock::System, args.seed))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let args = Args::parse(|key| std::env::var(key).ok(), &mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let services = open_services(&args).await?;
    let selection = commands::Selection::from(args);
    let mut input = std::io::stdin().lock();
    let mut out = std::io::stdout().lock();

    match cmd {
        Command::Quiz => commands::quiz(&services, &selection, &mut input, &mut out).await,
        Command::Flashcards => {
            commands::flashcards(&services, &selection, &mut input, &mut out).await
        }
        Command::Stats => commands::stats(&services, &selection, &mut out).await,
        Command::Words => commands::words(&services, &selection, &mut out).await,
        Command::History => commands::history(&services, &selection, &mut out).await,
    }
}

impl From<Args> for commands::Selection {
    fn from(args: Args) -> Self {
        Self {
            user_id: args.user_id,
            count: args.count,
            letter: args.letter,
            complexity: args.complexity,
            page: args.page,
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
