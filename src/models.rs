//! Core data models used throughout Paperbase.
//!
//! These types represent the papers, analyses, and search hits that flow
//! through the ingestion and retrieval pipeline.

use serde::{Deserialize, Serialize};

/// Named subset of the vector index, each queried independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Chunked full text, many records per paper.
    Fulltext,
    /// One abstract record per paper.
    Abstract,
    /// One AI-extracted analysis summary per paper.
    Analysis,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Fulltext => "fulltext",
            Partition::Abstract => "abstract",
            Partition::Analysis => "analysis",
        }
    }

    pub fn parse(s: &str) -> Option<Partition> {
        match s {
            "fulltext" => Some(Partition::Fulltext),
            "abstract" => Some(Partition::Abstract),
            "analysis" => Some(Partition::Analysis),
            _ => None,
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored paper. Created once on import, never mutated by retrieval.
#[derive(Debug, Clone)]
pub struct Paper {
    pub id: String,
    pub title: String,
    pub authors: Option<String>,
    pub year: Option<i64>,
    pub venue: Option<String>,
    pub abstract_text: Option<String>,
    pub raw_text: String,
    pub markdown_text: String,
    /// SHA-256 of the source PDF bytes; unique across all papers.
    pub content_hash: String,
    pub pdf_path: Option<String>,
    pub created_at: i64,
}

/// Fields supplied when inserting a paper. The store assigns the id and
/// timestamp, and enforces content-hash dedup.
#[derive(Debug, Clone)]
pub struct NewPaper {
    pub title: String,
    pub authors: Option<String>,
    pub year: Option<i64>,
    pub venue: Option<String>,
    pub abstract_text: Option<String>,
    pub raw_text: String,
    pub markdown_text: String,
    pub content_hash: String,
    pub pdf_path: Option<String>,
}

/// Structured extraction produced by the LLM for one paper.
///
/// Zero-or-more rows may exist per paper; reads return the most recent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperAnalysis {
    #[serde(default)]
    pub research_question: String,
    #[serde(default)]
    pub methodology: String,
    #[serde(default)]
    pub main_findings: Vec<String>,
    #[serde(default)]
    pub key_contributions: Vec<String>,
    #[serde(default)]
    pub limitations: Vec<String>,
    #[serde(default)]
    pub future_work: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl PaperAnalysis {
    /// Flatten the analysis into one text block for embedding into the
    /// `analysis` partition.
    pub fn summary_text(&self) -> String {
        format!(
            "Research question: {}\nMethodology: {}\nMain findings: {}\nKey contributions: {}\nKeywords: {}",
            self.research_question,
            self.methodology,
            self.main_findings.join(" "),
            self.key_contributions.join(" "),
            self.keywords.join(" "),
        )
    }
}

/// A transient, per-query value: a paper joined with whichever scores the
/// search path that produced it computed. Never persisted.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub paper: Paper,
    /// `1 - distance` of the best-matching chunk. Ranking signal only.
    pub relevance_score: Option<f64>,
    /// Raw lexical-overlap score (title bonus + occurrence credit).
    pub keyword_score: Option<f64>,
    /// Weighted combination of the normalized scores (hybrid search).
    pub final_score: Option<f64>,
}

impl SearchHit {
    pub fn semantic(paper: Paper, relevance_score: f64) -> Self {
        Self {
            paper,
            relevance_score: Some(relevance_score),
            keyword_score: None,
            final_score: None,
        }
    }

    pub fn keyword(paper: Paper, keyword_score: f64) -> Self {
        Self {
            paper,
            relevance_score: None,
            keyword_score: Some(keyword_score),
            final_score: None,
        }
    }

    /// The score a caller should rank by: final, then relevance, then keyword.
    pub fn display_score(&self) -> f64 {
        self.final_score
            .or(self.relevance_score)
            .or(self.keyword_score)
            .unwrap_or(0.0)
    }
}

/// Lightweight projection for listing UIs, not search.
#[derive(Debug, Clone, Serialize)]
pub struct PaperSummary {
    pub id: String,
    pub title: String,
    pub authors: Option<String>,
    pub year: Option<i64>,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research_question: Option<String>,
}

/// One nearest-neighbor hit from the vector index, before the join back to
/// the paper store. `metadata` always carries the owning `paper_id`.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub metadata: serde_json::Value,
    /// Cosine distance, ascending = closer.
    pub distance: f64,
}

impl Neighbor {
    pub fn paper_id(&self) -> Option<&str> {
        self.metadata.get("paper_id").and_then(|v| v.as_str())
    }
}
