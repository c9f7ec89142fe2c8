//! # Paperbase
//!
//! A local-first academic paper base: PDF ingestion, hybrid retrieval,
//! and LLM-assisted analysis and literature review synthesis.
//!
//! Paperbase ingests PDF papers into SQLite, embeds their text into a
//! three-partition vector index (fulltext / abstract / analysis), and
//! exposes semantic, keyword, and hybrid search plus structured analysis
//! extraction and review generation via a CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌───────────────┐
//! │   PDFs   │──▶│   Pipeline     │──▶│    SQLite      │
//! │ (import) │   │ Parse+Chunk   │   │ papers + vecs │
//! └──────────┘   │    +Embed     │   └──────┬────────┘
//!                └───────────────┘          │
//!                      ┌────────────────────┤
//!                      ▼                    ▼
//!                 ┌──────────┐        ┌──────────┐
//!                 │  Query   │        │   LLM    │
//!                 │  Engine  │        │ analyze/ │
//!                 │  (ppb)   │        │  review  │
//!                 └──────────┘        └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ppb init                          # create database
//! ppb import ./papers               # ingest a directory of PDFs
//! ppb search "transformers" --mode hybrid
//! ppb analyze --all                 # LLM extraction per paper
//! ppb review "efficient attention"  # synthesize a literature review
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`store`] | Document store (papers + analyses) |
//! | [`vector`] | Partitioned vector index |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`pdf`] | PDF extraction and metadata heuristics |
//! | [`ingest`] | Import pipeline |
//! | [`semantic`] | Semantic search |
//! | [`keyword`] | Keyword search baseline |
//! | [`hybrid`] | Weighted hybrid merge + filters |
//! | [`query`] | Query engine facade |
//! | [`llm`] | LLM client abstraction |
//! | [`analyze`] | Structured analysis extraction |
//! | [`review`] | Literature review synthesis |

pub mod analyze;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod hybrid;
pub mod ingest;
pub mod keyword;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod pdf;
pub mod prompts;
pub mod query;
pub mod review;
pub mod semantic;
pub mod store;
pub mod vector;

#[cfg(test)]
pub mod testutil;
