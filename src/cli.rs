//! Command-line interface
//!
//! Every query command prints a JSON array on stdout; logs go to stderr.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// listing-search CLI
#[derive(Parser, Debug)]
#[command(name = "listing-search")]
#[command(about = "Typo-tolerant autocomplete and landmark search over property listings", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output (no short flag to avoid conflicts)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// SQLite database of listings
    #[arg(long, global = true, env = "LISTING_SEARCH_DB")]
    pub db: Option<PathBuf>,

    /// JSON array of listing records, served from memory
    #[arg(long, global = true, env = "LISTING_SEARCH_LISTINGS")]
    pub listings: Option<PathBuf>,

    /// JSON settings file (defaults to the platform config directory)
    #[arg(long, global = true, env = "LISTING_SEARCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    pub timeout_secs: u64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Suggest listing titles for a short, possibly misspelled fragment
    Autocomplete(QueryArgs),
    /// Search listings, near a landmark when the query names one
    Search(QueryArgs),
    /// Show the lexical score of one title against a query
    Score(ScoreArgs),
    /// Create the database schema, optionally loading --listings into it
    InitDb,
}

#[derive(Parser, Debug, Clone)]
pub struct QueryArgs {
    /// Free-text query
    #[arg(short = 'q', long)]
    pub query: String,
}

#[derive(Parser, Debug, Clone)]
pub struct ScoreArgs {
    /// Query text
    #[arg(short = 'q', long)]
    pub query: String,

    /// Listing title to compare against
    #[arg(short = 't', long)]
    pub title: String,
}
