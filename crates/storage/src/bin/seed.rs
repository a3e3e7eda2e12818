use std::fmt;
use std::path::PathBuf;

use storage::corpus::load_corpus;
use storage::repository::Storage;
use vocab_core::model::WordFilter;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    corpus: Vec<PathBuf>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    NoCorpus,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::NoCorpus => write!(f, "at least one --corpus file is required"),
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

fn split_paths(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("VOCAB_DB_URL").unwrap_or_else(|_| "sqlite://vocab.sqlite3".into());
        let mut corpus = std::env::var("VOCAB_CORPUS")
            .map(|raw| split_paths(&raw))
            .unwrap_or_default();
        let mut corpus_from_flags = false;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--corpus" => {
                    let value = require_value(&mut args, "--corpus")?;
                    // flags replace the environment list rather than extend it
                    if !corpus_from_flags {
                        corpus.clear();
                        corpus_from_flags = true;
                    }
                    corpus.extend(split_paths(&value));
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if corpus.is_empty() {
            return Err(ArgsError::NoCorpus);
        }
        Ok(Self { db_url, corpus })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- --corpus <file.json> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://vocab.sqlite3)");
    eprintln!("  --corpus <path[,path]>    Corpus JSON file(s), loaded in order; repeatable");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  VOCAB_DB_URL, VOCAB_CORPUS (comma-separated)");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let load = load_corpus(&args.corpus)?;
    for skipped in &load.skipped {
        eprintln!("skipped {:?}: {:?}", skipped.word, skipped.reason);
    }

    let storage = Storage::sqlite(&args.db_url).await?;
    let sync = storage.words.sync_words(&load.words).await?;
    let total = storage.words.count_words(WordFilter::default()).await?;

    println!(
        "Seeded {} words ({} skipped) into {}: {} new, {} updated, {} removed; corpus now holds {} words",
        load.words.len(),
        load.skipped.len(),
        args.db_url,
        sync.inserted,
        sync.updated,
        sync.removed,
        total
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
