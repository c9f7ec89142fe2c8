//! Error taxonomy for the retrieval layer.
//!
//! Hard errors ([`Error::NotFound`], [`Error::InvalidArgument`],
//! [`Error::Store`], [`Error::Upstream`]) propagate to the immediate caller
//! unmodified; nothing in the retrieval layer downgrades them to empty
//! results. The one soft case — an embedding record naming a paper id that
//! is absent from the store — is handled by drop-and-continue inside
//! semantic search, because partial ingest races are expected.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A referenced paper id is absent from the paper store.
    #[error("paper not found: {0}")]
    NotFound(String),

    /// Unknown search mode or malformed filter values. Never silently
    /// defaulted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The SQLite store failed. Not retried here; retry is a caller or
    /// infrastructure concern.
    #[error("paper store unavailable: {0}")]
    Store(#[from] sqlx::Error),

    /// The vector index or an embedding/LLM backend failed.
    #[error("upstream unavailable: {0}")]
    Upstream(#[from] anyhow::Error),

    /// The LLM's output was not valid JSON, even after extracting the
    /// first balanced `{...}` block.
    #[error("could not parse model output as JSON: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
