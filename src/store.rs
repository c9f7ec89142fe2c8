//! Paper store abstraction and SQLite implementation.
//!
//! The [`DocumentStore`] trait defines every operation the retrieval layer
//! needs from relational storage, enabling pluggable backends (SQLite
//! in production, in-memory in tests). All retrieval access is read-only;
//! writes happen only during import and analysis.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{NewPaper, Paper, PaperAnalysis};

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a paper, deduplicating on content hash.
    ///
    /// Returns `(id, created)`. Re-adding identical content returns the
    /// existing id with `created = false` rather than erroring or
    /// duplicating.
    async fn add_paper(&self, paper: &NewPaper) -> Result<(String, bool)>;

    /// Retrieve one paper by id.
    async fn get_paper(&self, id: &str) -> Result<Option<Paper>>;

    /// All papers in stable insertion order.
    async fn get_all_papers(&self) -> Result<Vec<Paper>>;

    /// Attach a structured analysis to a paper. Multiple analyses may
    /// accumulate; reads return the most recent.
    async fn add_analysis(
        &self,
        paper_id: &str,
        analysis: &PaperAnalysis,
        produced_by: &str,
    ) -> Result<String>;

    /// Most recent analysis for a paper, if any.
    async fn get_analysis(&self, paper_id: &str) -> Result<Option<PaperAnalysis>>;
}

/// SQLite-backed paper store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn paper_from_row(row: &sqlx::sqlite::SqliteRow) -> Paper {
    Paper {
        id: row.get("id"),
        title: row.get("title"),
        authors: row.get("authors"),
        year: row.get("year"),
        venue: row.get("venue"),
        abstract_text: row.get("abstract"),
        raw_text: row.get("raw_text"),
        markdown_text: row.get("markdown_text"),
        content_hash: row.get("content_hash"),
        pdf_path: row.get("pdf_path"),
        created_at: row.get("created_at"),
    }
}

const PAPER_COLUMNS: &str = "id, title, authors, year, venue, abstract, raw_text, \
     markdown_text, content_hash, pdf_path, created_at";

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn add_paper(&self, paper: &NewPaper) -> Result<(String, bool)> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();

        // Content-hash dedup, done atomically: concurrent imports of
        // identical bytes both resolve to the single stored row.
        let result = sqlx::query(
            r#"
            INSERT INTO papers (id, title, authors, year, venue, abstract,
                                raw_text, markdown_text, content_hash, pdf_path, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(content_hash) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(&paper.title)
        .bind(&paper.authors)
        .bind(paper.year)
        .bind(&paper.venue)
        .bind(&paper.abstract_text)
        .bind(&paper.raw_text)
        .bind(&paper.markdown_text)
        .bind(&paper.content_hash)
        .bind(&paper.pdf_path)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok((id, true));
        }

        let existing: String = sqlx::query_scalar("SELECT id FROM papers WHERE content_hash = ?")
            .bind(&paper.content_hash)
            .fetch_one(&self.pool)
            .await?;
        Ok((existing, false))
    }

    async fn get_paper(&self, id: &str) -> Result<Option<Paper>> {
        let row = sqlx::query(&format!("SELECT {} FROM papers WHERE id = ?", PAPER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(paper_from_row))
    }

    async fn get_all_papers(&self) -> Result<Vec<Paper>> {
        // rowid tiebreak keeps same-second inserts in insertion order.
        let rows = sqlx::query(&format!(
            "SELECT {} FROM papers ORDER BY created_at ASC, rowid ASC",
            PAPER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(paper_from_row).collect())
    }

    async fn add_analysis(
        &self,
        paper_id: &str,
        analysis: &PaperAnalysis,
        produced_by: &str,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO paper_analysis (id, paper_id, research_question, methodology,
                findings_json, contributions_json, limitations_json, future_work,
                keywords_json, produced_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(paper_id)
        .bind(&analysis.research_question)
        .bind(&analysis.methodology)
        .bind(serde_json::to_string(&analysis.main_findings).unwrap_or_else(|_| "[]".into()))
        .bind(serde_json::to_string(&analysis.key_contributions).unwrap_or_else(|_| "[]".into()))
        .bind(serde_json::to_string(&analysis.limitations).unwrap_or_else(|_| "[]".into()))
        .bind(&analysis.future_work)
        .bind(serde_json::to_string(&analysis.keywords).unwrap_or_else(|_| "[]".into()))
        .bind(produced_by)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_analysis(&self, paper_id: &str) -> Result<Option<PaperAnalysis>> {
        let row = sqlx::query(
            r#"
            SELECT research_question, methodology, findings_json, contributions_json,
                   limitations_json, future_work, keywords_json
            FROM paper_analysis
            WHERE paper_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT 1
            "#,
        )
        .bind(paper_id)
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(r) => r,
            None => return Ok(None),
        };

        let parse_list = |col: &str| -> Vec<String> {
            let raw: String = row.get(col);
            serde_json::from_str(&raw).unwrap_or_default()
        };

        Ok(Some(PaperAnalysis {
            research_question: row
                .get::<Option<String>, _>("research_question")
                .unwrap_or_default(),
            methodology: row
                .get::<Option<String>, _>("methodology")
                .unwrap_or_default(),
            main_findings: parse_list("findings_json"),
            key_contributions: parse_list("contributions_json"),
            limitations: parse_list("limitations_json"),
            future_work: row
                .get::<Option<String>, _>("future_work")
                .unwrap_or_default(),
            keywords: parse_list("keywords_json"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{memory_pool, sample_paper};

    #[tokio::test]
    async fn add_paper_is_idempotent_on_content_hash() {
        let pool = memory_pool().await;
        let store = SqliteStore::new(pool);

        let paper = sample_paper("Deep Learning for NLP", "hash-a");
        let (id1, created1) = store.add_paper(&paper).await.unwrap();
        let (id2, created2) = store.add_paper(&paper).await.unwrap();

        assert!(created1);
        assert!(!created2);
        assert_eq!(id1, id2);
        assert_eq!(store.get_all_papers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn add_paper_conflict_keeps_first_row() {
        let pool = memory_pool().await;
        let store = SqliteStore::new(pool);

        let (id1, _) = store
            .add_paper(&sample_paper("Original", "hash-z"))
            .await
            .unwrap();
        let (id2, created2) = store
            .add_paper(&sample_paper("Renamed", "hash-z"))
            .await
            .unwrap();

        assert!(!created2);
        assert_eq!(id1, id2);
        let stored = store.get_paper(&id1).await.unwrap().unwrap();
        assert_eq!(stored.title, "Original");
    }

    #[tokio::test]
    async fn get_all_papers_preserves_insertion_order() {
        let pool = memory_pool().await;
        let store = SqliteStore::new(pool);

        for (i, title) in ["First", "Second", "Third"].iter().enumerate() {
            let paper = sample_paper(title, &format!("hash-{}", i));
            store.add_paper(&paper).await.unwrap();
        }

        let titles: Vec<String> = store
            .get_all_papers()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
    }

    #[tokio::test]
    async fn get_analysis_returns_most_recent() {
        let pool = memory_pool().await;
        let store = SqliteStore::new(pool);

        let (id, _) = store
            .add_paper(&sample_paper("Paper", "hash-x"))
            .await
            .unwrap();

        let mut first = PaperAnalysis {
            research_question: "old question".into(),
            ..blank_analysis()
        };
        store.add_analysis(&id, &first, "test/model").await.unwrap();
        first.research_question = "new question".into();
        store.add_analysis(&id, &first, "test/model").await.unwrap();

        let loaded = store.get_analysis(&id).await.unwrap().unwrap();
        assert_eq!(loaded.research_question, "new question");
    }

    #[tokio::test]
    async fn get_analysis_absent_is_none() {
        let pool = memory_pool().await;
        let store = SqliteStore::new(pool);
        let (id, _) = store
            .add_paper(&sample_paper("Paper", "hash-y"))
            .await
            .unwrap();
        assert!(store.get_analysis(&id).await.unwrap().is_none());
    }

    fn blank_analysis() -> PaperAnalysis {
        PaperAnalysis {
            research_question: String::new(),
            methodology: String::new(),
            main_findings: Vec::new(),
            key_contributions: Vec::new(),
            limitations: Vec::new(),
            future_work: String::new(),
            keywords: Vec::new(),
        }
    }
}
