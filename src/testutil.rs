//! Shared test fixtures: in-memory database, sample records, and
//! deterministic stand-ins for the embedding and index traits.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::migrate;
use crate::models::{Neighbor, NewPaper, Partition};
use crate::vector::{VectorIndex, VectorRecord};

/// Fresh in-memory SQLite pool with the full schema applied.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    migrate::apply_schema(&pool).await.unwrap();
    pool
}

/// Minimal valid paper for store tests. Distinct `hash` values keep the
/// content-hash dedup from collapsing inserts.
pub fn sample_paper(title: &str, hash: &str) -> NewPaper {
    NewPaper {
        title: title.to_string(),
        authors: Some("Ada Lovelace, Alan Turing".to_string()),
        year: Some(2024),
        venue: None,
        abstract_text: Some(format!("Abstract of {}", title)),
        raw_text: format!("Full text of {}.", title),
        markdown_text: format!("# {}\n\nFull text.", title),
        content_hash: hash.to_string(),
        pdf_path: None,
    }
}

/// Deterministic embedder: hashes each whitespace token into one of 16
/// buckets and counts occurrences. Texts sharing vocabulary get high
/// cosine similarity, disjoint texts get low, with no network involved.
pub struct CountingEmbedder;

#[async_trait]
impl EmbeddingProvider for CountingEmbedder {
    fn model_name(&self) -> &str {
        "test/counting"
    }

    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vec = vec![0.0f32; 16];
                for token in text.split_whitespace() {
                    let bucket: usize =
                        token.bytes().map(|b| b as usize).sum::<usize>() % 16;
                    vec[bucket] += 1.0;
                }
                vec
            })
            .collect())
    }
}

/// Index double that replays a fixed neighbor list per partition,
/// ignoring the query text. Upserts and deletes are no-ops.
pub struct ScriptedIndex {
    results: HashMap<Partition, Vec<Neighbor>>,
}

impl ScriptedIndex {
    pub fn new() -> Self {
        Self {
            results: HashMap::new(),
        }
    }

    /// Append one neighbor to a partition's scripted response. Callers
    /// push in the ascending-distance order a real index would return.
    pub fn push(&mut self, partition: Partition, paper_id: &str, distance: f64) {
        self.results.entry(partition).or_default().push(Neighbor {
            metadata: serde_json::json!({ "paper_id": paper_id }),
            distance,
        });
    }
}

#[async_trait]
impl VectorIndex for ScriptedIndex {
    async fn upsert(
        &self,
        _partition: Partition,
        _record_id: &str,
        _paper_id: &str,
        _payload: &str,
        _metadata: serde_json::Value,
    ) -> Result<()> {
        Ok(())
    }

    async fn upsert_batch(&self, _partition: Partition, _records: &[VectorRecord]) -> Result<()> {
        Ok(())
    }

    async fn query(
        &self,
        partition: Partition,
        _query_text: &str,
        k: usize,
    ) -> Result<Vec<Neighbor>> {
        let mut neighbors = self.results.get(&partition).cloned().unwrap_or_default();
        neighbors.truncate(k);
        Ok(neighbors)
    }

    async fn delete_paper(&self, _paper_id: &str) -> Result<()> {
        Ok(())
    }
}
