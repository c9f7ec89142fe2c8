use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create all tables and indexes. Idempotent.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS papers (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            authors TEXT,
            year INTEGER,
            venue TEXT,
            abstract TEXT,
            raw_text TEXT NOT NULL,
            markdown_text TEXT NOT NULL,
            content_hash TEXT NOT NULL UNIQUE,
            pdf_path TEXT,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS paper_analysis (
            id TEXT PRIMARY KEY,
            paper_id TEXT NOT NULL,
            research_question TEXT,
            methodology TEXT,
            findings_json TEXT NOT NULL DEFAULT '[]',
            contributions_json TEXT NOT NULL DEFAULT '[]',
            limitations_json TEXT NOT NULL DEFAULT '[]',
            future_work TEXT,
            keywords_json TEXT NOT NULL DEFAULT '[]',
            produced_by TEXT,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (paper_id) REFERENCES papers(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS embedding_records (
            id TEXT PRIMARY KEY,
            partition TEXT NOT NULL,
            paper_id TEXT NOT NULL,
            payload TEXT NOT NULL,
            embedding BLOB NOT NULL,
            metadata_json TEXT NOT NULL DEFAULT '{}',
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_papers_year ON papers(year)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_analysis_paper_id ON paper_analysis(paper_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_embedding_partition ON embedding_records(partition)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_embedding_paper_id ON embedding_records(paper_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
