//! # Paperbase CLI (`ppb`)
//!
//! The `ppb` binary is the primary interface for Paperbase. It provides
//! commands for database initialization, PDF import, search, analysis
//! extraction, and literature review synthesis.
//!
//! ## Usage
//!
//! ```bash
//! ppb --config ./config/paperbase.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ppb init` | Create the SQLite database and run schema migrations |
//! | `ppb import <path>` | Import a PDF file or a directory of PDFs |
//! | `ppb search "<query>"` | Search imported papers |
//! | `ppb similar <id>` | Find papers similar to a stored one |
//! | `ppb show <id>` | Print a paper and its analysis |
//! | `ppb list` | List all imported papers |
//! | `ppb analyze` | Run LLM analysis extraction over papers |
//! | `ppb review "<topic>"` | Generate a literature review for a topic |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! ppb init --config ./config/paperbase.toml
//!
//! # Import a directory of PDFs
//! ppb import ./papers
//!
//! # Hybrid search (semantic + keyword)
//! ppb search "sparse attention" --mode hybrid
//!
//! # Filtered search
//! ppb search "attention" --mode advanced --year-from 2020 --author Vaswani
//!
//! # Analyze every paper without an analysis yet
//! ppb analyze --all
//!
//! # Synthesize a review with numbered citations
//! ppb review "efficient transformers"
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use paperbase::{analyze, config, ingest, migrate, query, review};

/// Paperbase CLI — a local-first academic paper base with hybrid
/// retrieval and LLM-assisted analysis.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/paperbase.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "ppb",
    about = "Paperbase — a local-first academic paper base with hybrid retrieval",
    version,
    long_about = "Paperbase ingests PDF papers into SQLite, embeds their text into a \
    three-partition vector index (fulltext, abstract, analysis), and exposes semantic, \
    keyword, and hybrid search plus LLM-assisted analysis extraction and literature \
    review synthesis."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/paperbase.toml`. Database, chunking,
    /// retrieval, embedding, and LLM settings are read from this file.
    #[arg(long, global = true, default_value = "./config/paperbase.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (papers, paper_analysis, embedding_records). This command is
    /// idempotent — running it multiple times is safe.
    Init,

    /// Import a PDF file or a directory of PDFs.
    ///
    /// Extracts text, derives title/authors/abstract/year heuristically,
    /// deduplicates by content hash, and (when an embedding provider is
    /// configured) embeds fulltext chunks and the abstract. Embedding
    /// failures are non-fatal; the paper is stored either way.
    Import {
        /// A `.pdf` file or a directory scanned recursively for PDFs.
        path: PathBuf,
    },

    /// Search imported papers.
    ///
    /// Modes: `hybrid` (weighted semantic + keyword merge, the default),
    /// `semantic` (vector only), `keyword` (lexical only), `advanced`
    /// (hybrid with year/author filters). Filter flags on a hybrid query
    /// switch it to advanced automatically.
    Search {
        /// The search query string.
        query: String,

        /// Search mode: `semantic`, `keyword`, `hybrid`, or `advanced`.
        #[arg(long, default_value = "hybrid")]
        mode: String,

        /// Partition for semantic mode: `fulltext`, `abstract`, or `analysis`.
        #[arg(long)]
        partition: Option<String>,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,

        /// Override the configured semantic weight for this query.
        #[arg(long)]
        semantic_weight: Option<f64>,

        /// Override the configured keyword weight for this query.
        #[arg(long)]
        keyword_weight: Option<f64>,

        /// Only return papers published in or after this year.
        #[arg(long)]
        year_from: Option<i64>,

        /// Only return papers published in or before this year.
        #[arg(long)]
        year_to: Option<i64>,

        /// Author substring filter (repeatable, case-insensitive, any-of).
        #[arg(long = "author")]
        authors: Vec<String>,
    },

    /// Find papers similar to a stored one.
    ///
    /// Uses the source paper's text as a query against the abstract
    /// partition. The source paper itself is never returned.
    Similar {
        /// Paper id.
        id: String,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print a paper's metadata, abstract, and analysis.
    Show {
        /// Paper id.
        id: String,
    },

    /// List all imported papers with analysis keywords when available.
    List,

    /// Run LLM analysis extraction.
    ///
    /// Prompts the configured model for a structured extraction per
    /// paper (research question, methodology, findings, contributions,
    /// limitations, future work, keywords), stores it, and embeds a
    /// summary into the analysis partition.
    Analyze {
        /// Analyze one paper by id.
        #[arg(long)]
        id: Option<String>,

        /// Analyze every paper that has no analysis yet.
        #[arg(long)]
        all: bool,
    },

    /// Generate a literature review for a topic.
    ///
    /// Hybrid-retrieves the most relevant papers, feeds numbered briefs
    /// to the configured model, and prints a structured review with
    /// `[n]` citations followed by the numbered source list.
    Review {
        /// Research topic to review.
        topic: String,

        /// Maximum number of papers fed to the model.
        #[arg(long, default_value_t = 20)]
        max_papers: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Import { path } => {
            ingest::run_import(&cfg, &path).await?;
        }
        Commands::Search {
            query,
            mode,
            partition,
            limit,
            semantic_weight,
            keyword_weight,
            year_from,
            year_to,
            authors,
        } => {
            let args = query::CliSearchArgs {
                mode,
                partition,
                limit,
                semantic_weight,
                keyword_weight,
                year_from,
                year_to,
                authors,
            };
            query::run_search(&cfg, &query, args).await?;
        }
        Commands::Similar { id, limit } => {
            query::run_similar(&cfg, &id, limit).await?;
        }
        Commands::Show { id } => {
            query::run_show(&cfg, &id).await?;
        }
        Commands::List => {
            query::run_list(&cfg).await?;
        }
        Commands::Analyze { id, all } => {
            analyze::run_analyze(&cfg, id, all).await?;
        }
        Commands::Review { topic, max_papers } => {
            review::run_review(&cfg, &topic, max_papers).await?;
        }
    }

    Ok(())
}
