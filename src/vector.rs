//! Vector index over three named partitions (fulltext / abstract / analysis).
//!
//! The [`VectorIndex`] trait is the retrieval layer's only view of
//! embedding storage: upsert a record, query nearest neighbors in one
//! partition, delete everything for a paper. Embedding vectors are opaque
//! here; only distance ordering matters to callers.
//!
//! [`SqliteVectorIndex`] stores vectors as little-endian f32 BLOBs and
//! answers queries by brute-force cosine similarity computed in Rust,
//! returning `distance = 1 - cosine` in ascending order.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::embedding::{self, EmbeddingProvider};
use crate::error::Result;
use crate::models::{Neighbor, Partition};

/// One record pending insertion via [`VectorIndex::upsert_batch`].
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub record_id: String,
    pub paper_id: String,
    pub payload: String,
    pub metadata: serde_json::Value,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace one embedding record. `metadata` must carry the
    /// owning `paper_id` for the join back to the paper store.
    async fn upsert(
        &self,
        partition: Partition,
        record_id: &str,
        paper_id: &str,
        payload: &str,
        metadata: serde_json::Value,
    ) -> Result<()>;

    /// Insert or replace several records in one pass. Implementations
    /// may embed all payloads in a single provider round trip.
    async fn upsert_batch(&self, partition: Partition, records: &[VectorRecord]) -> Result<()>;

    /// Nearest neighbors for `query_text` within one partition, ascending
    /// by distance, at most `k` records.
    async fn query(&self, partition: Partition, query_text: &str, k: usize)
        -> Result<Vec<Neighbor>>;

    /// Remove every record belonging to a paper, across all partitions.
    async fn delete_paper(&self, paper_id: &str) -> Result<()>;
}

/// SQLite-backed index with brute-force cosine scoring.
pub struct SqliteVectorIndex {
    pool: SqlitePool,
    provider: Box<dyn EmbeddingProvider>,
}

impl SqliteVectorIndex {
    pub fn new(pool: SqlitePool, provider: Box<dyn EmbeddingProvider>) -> Self {
        Self { pool, provider }
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn upsert(
        &self,
        partition: Partition,
        record_id: &str,
        paper_id: &str,
        payload: &str,
        metadata: serde_json::Value,
    ) -> Result<()> {
        self.upsert_batch(
            partition,
            &[VectorRecord {
                record_id: record_id.to_string(),
                paper_id: paper_id.to_string(),
                payload: payload.to_string(),
                metadata,
            }],
        )
        .await
    }

    async fn upsert_batch(&self, partition: Partition, records: &[VectorRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        // One provider round trip for the whole batch.
        let payloads: Vec<String> = records.iter().map(|r| r.payload.clone()).collect();
        let vectors = self.provider.embed(&payloads).await?;
        if vectors.len() != records.len() {
            return Err(anyhow::anyhow!(
                "Provider returned {} vectors for {} inputs",
                vectors.len(),
                records.len()
            )
            .into());
        }

        let now = chrono::Utc::now().timestamp();
        for (record, vector) in records.iter().zip(&vectors) {
            let blob = embedding::vec_to_blob(vector);
            sqlx::query(
                r#"
                INSERT INTO embedding_records (id, partition, paper_id, payload, embedding, metadata_json, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    partition = excluded.partition,
                    paper_id = excluded.paper_id,
                    payload = excluded.payload,
                    embedding = excluded.embedding,
                    metadata_json = excluded.metadata_json,
                    created_at = excluded.created_at
                "#,
            )
            .bind(&record.record_id)
            .bind(partition.as_str())
            .bind(&record.paper_id)
            .bind(&record.payload)
            .bind(&blob)
            .bind(record.metadata.to_string())
            .bind(now)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    async fn query(
        &self,
        partition: Partition,
        query_text: &str,
        k: usize,
    ) -> Result<Vec<Neighbor>> {
        let query_vec = embedding::embed_query(self.provider.as_ref(), query_text).await?;

        let rows = sqlx::query(
            "SELECT metadata_json, embedding FROM embedding_records WHERE partition = ?",
        )
        .bind(partition.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut neighbors: Vec<Neighbor> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vec = embedding::blob_to_vec(&blob);
                let similarity = embedding::cosine_similarity(&query_vec, &vec) as f64;
                let metadata_raw: String = row.get("metadata_json");
                let metadata =
                    serde_json::from_str(&metadata_raw).unwrap_or(serde_json::json!({}));
                Neighbor {
                    metadata,
                    distance: 1.0 - similarity,
                }
            })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        neighbors.truncate(k);

        Ok(neighbors)
    }

    async fn delete_paper(&self, paper_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM embedding_records WHERE paper_id = ?")
            .bind(paper_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Deterministic record id for a fulltext chunk.
pub fn fulltext_record_id(paper_id: &str, chunk_index: usize) -> String {
    format!("paper_{}_chunk_{}", paper_id, chunk_index)
}

/// Deterministic record id for a paper's abstract.
pub fn abstract_record_id(paper_id: &str) -> String {
    format!("paper_{}_abstract", paper_id)
}

/// Deterministic record id for a paper's analysis summary.
pub fn analysis_record_id(paper_id: &str) -> String {
    format!("paper_{}_analysis", paper_id)
}
