//! listing-search CLI (Rust)
//!
//! Command-line front end for the ranking engine:
//! - `autocomplete -q <text>` - typo-tolerant title suggestions
//! - `search -q <text>` - free-text / landmark search
//! - `score -q <text> -t <title>` - lexical score breakdown
//! - `init-db --db <path>` - create (and optionally load) a SQLite store

mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands, QueryArgs, ScoreArgs};
use listing_search::search::{LexicalScorer, StrategyScores};
use listing_search::{Backend, MemoryStore, SearchEngine, Settings, SqliteStore, StoreError};
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };

    // RUST_LOG wins over the flags when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr) // Log to stderr to keep stdout clean
        .init();

    match run(cli).await {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(get_exit_code(&e));
        }
    }
}

async fn run(cli: Cli) -> Result<String> {
    let Cli {
        command,
        db,
        listings,
        config,
        timeout_secs,
        ..
    } = cli;
    let timeout = Duration::from_secs(timeout_secs);

    match command {
        Commands::Autocomplete(QueryArgs { query }) => {
            let engine = open_engine(db, listings, config.as_deref())?;
            let entries = with_timeout(timeout, engine.autocomplete(&query)).await;
            to_json(&entries)
        }
        Commands::Search(QueryArgs { query }) => {
            let engine = open_engine(db, listings, config.as_deref())?;
            let entries = with_timeout(timeout, engine.search(&query)).await;
            to_json(&entries)
        }
        Commands::Score(ScoreArgs { query, title }) => to_json(&ScoreReport::new(&query, &title)),
        Commands::InitDb => {
            let db = db.context("Invalid usage: init-db requires --db <path>")?;
            init_db(&db, listings.as_deref())
        }
    }
}

/// Per-strategy breakdown printed by `score`
#[derive(Serialize)]
struct ScoreReport<'a> {
    query: &'a str,
    title: &'a str,
    #[serde(flatten)]
    scores: StrategyScores,
    score: u8,
}

impl<'a> ScoreReport<'a> {
    fn new(query: &'a str, title: &'a str) -> Self {
        let scores = LexicalScorer::new().breakdown(query, title);
        Self {
            query,
            title,
            scores,
            score: scores.best(),
        }
    }
}

/// Pick exactly one backend from the store flags
fn open_backend(db: Option<PathBuf>, listings: Option<PathBuf>) -> Result<Backend> {
    match (db, listings) {
        (Some(db), None) => {
            debug!("Using SQLite store at {}", db.display());
            Ok(Backend::Sqlite(SqliteStore::new(db)))
        }
        (None, Some(path)) => {
            debug!("Loading listings snapshot from {}", path.display());
            let store = MemoryStore::from_json_file(&path)
                .with_context(|| format!("Failed to load listings from {}", path.display()))?;
            Ok(Backend::Memory(store))
        }
        (Some(_), Some(_)) => bail!("Invalid usage: pass either --db or --listings, not both"),
        (None, None) => bail!("Invalid usage: a store is required (--db <path> or --listings <json>)"),
    }
}

fn open_engine(
    db: Option<PathBuf>,
    listings: Option<PathBuf>,
    config: Option<&Path>,
) -> Result<SearchEngine<Backend>> {
    let settings = Settings::load(config)?;
    let store = open_backend(db, listings)?;
    SearchEngine::new(store, settings)
}

fn init_db(db: &Path, listings: Option<&Path>) -> Result<String> {
    let store = SqliteStore::new(db);
    store.create_schema()?;
    info!("Schema ready at {}", db.display());

    let inserted = match listings {
        Some(path) => {
            let snapshot = MemoryStore::from_json_file(path)
                .with_context(|| format!("Failed to load listings from {}", path.display()))?;
            let count = store.insert(snapshot.records())?;
            info!("Inserted {} listings from {}", count, path.display());
            count
        }
        None => 0,
    };

    to_json(&serde_json::json!({
        "database": db.display().to_string(),
        "inserted": inserted,
    }))
}

/// Timeouts degrade to an empty list like any other failure
async fn with_timeout<T>(limit: Duration, request: impl Future<Output = Vec<T>>) -> Vec<T> {
    match tokio::time::timeout(limit, request).await {
        Ok(entries) => entries,
        Err(_) => {
            warn!(code = "timeout", "Request exceeded {:?}, returning no suggestions", limit);
            Vec::new()
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Map errors to exit codes
fn get_exit_code(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<StoreError>().is_some() {
        return 2; // Store unavailable or rejected a query
    }

    let err_str = err.to_string().to_lowercase();
    if err_str.contains("invalid") || err_str.contains("usage") {
        1 // Invalid arguments or usage error
    } else if err_str.contains("not found") {
        3 // Not found error
    } else {
        5 // Other application errors
    }
}
