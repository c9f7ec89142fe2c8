//! PDF import pipeline orchestration.
//!
//! Coordinates the full import flow: walk → extract → heuristics →
//! dedup insert → chunking → embedding. Embedding runs inline and is
//! non-fatal on failure; the paper row always lands first, so a later
//! re-import can fill in missing vectors.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::db;
use crate::embedding;
use crate::models::{NewPaper, Partition};
use crate::pdf;
use crate::store::{DocumentStore, SqliteStore};
use crate::vector::{self, SqliteVectorIndex, VectorIndex, VectorRecord};

pub async fn run_import(config: &Config, path: &Path) -> Result<()> {
    let pdfs = collect_pdfs(path)?;
    if pdfs.is_empty() {
        bail!("No PDF files found under {}", path.display());
    }

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let index: Option<SqliteVectorIndex> = if config.embedding.is_enabled() {
        let provider = embedding::create_provider(&config.embedding)?;
        Some(SqliteVectorIndex::new(pool.clone(), provider))
    } else {
        None
    };

    let mut imported = 0u64;
    let mut duplicates = 0u64;
    let mut failed = 0u64;
    let mut embedded_records = 0u64;

    for pdf_path in &pdfs {
        match import_one(config, &store, index.as_ref(), pdf_path).await {
            Ok(ImportOutcome::Created { title, records }) => {
                println!("  imported: {} ({})", title, pdf_path.display());
                imported += 1;
                embedded_records += records;
            }
            Ok(ImportOutcome::Duplicate { title }) => {
                println!("  skipped duplicate: {} ({})", title, pdf_path.display());
                duplicates += 1;
            }
            Err(e) => {
                eprintln!("Warning: failed to import {}: {:#}", pdf_path.display(), e);
                failed += 1;
            }
        }
    }

    println!("import {}", path.display());
    println!("  files found: {}", pdfs.len());
    println!("  imported: {}", imported);
    println!("  duplicates: {}", duplicates);
    if config.embedding.is_enabled() {
        println!("  embedding records written: {}", embedded_records);
    }
    if failed > 0 {
        println!("  failed: {}", failed);
    }
    println!("ok");

    pool.close().await;
    Ok(())
}

enum ImportOutcome {
    Created { title: String, records: u64 },
    Duplicate { title: String },
}

async fn import_one(
    config: &Config,
    store: &SqliteStore,
    index: Option<&SqliteVectorIndex>,
    pdf_path: &Path,
) -> Result<ImportOutcome> {
    let (parsed, bytes) = pdf::parse_pdf(pdf_path)?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let content_hash = format!("{:x}", hasher.finalize());

    let paper = NewPaper {
        title: parsed.title.clone(),
        authors: if parsed.authors.is_empty() {
            None
        } else {
            Some(parsed.authors.join(", "))
        },
        year: parsed.year,
        venue: None,
        abstract_text: parsed.abstract_text.clone(),
        raw_text: parsed.raw_text,
        markdown_text: parsed.markdown_text.clone(),
        content_hash,
        pdf_path: Some(pdf_path.to_string_lossy().into_owned()),
    };

    let (paper_id, created) = store.add_paper(&paper).await?;
    if !created {
        return Ok(ImportOutcome::Duplicate {
            title: parsed.title,
        });
    }

    // Inline embedding (non-fatal)
    let mut records = 0u64;
    if let Some(index) = index {
        match embed_paper(config, index, &paper_id, &paper).await {
            Ok(n) => records = n,
            Err(e) => eprintln!(
                "Warning: embedding failed for {} ({}): {:#}",
                parsed.title, paper_id, e
            ),
        }
    }

    Ok(ImportOutcome::Created {
        title: parsed.title,
        records,
    })
}

/// Write the fulltext chunk records and the abstract record for one paper.
async fn embed_paper(
    config: &Config,
    index: &SqliteVectorIndex,
    paper_id: &str,
    paper: &NewPaper,
) -> Result<u64> {
    let chunks = chunk_text(
        &paper.markdown_text,
        config.chunking.chunk_size,
        config.chunking.chunk_overlap,
    );

    let records: Vec<VectorRecord> = chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| VectorRecord {
            record_id: vector::fulltext_record_id(paper_id, i),
            paper_id: paper_id.to_string(),
            payload: chunk,
            metadata: serde_json::json!({ "paper_id": paper_id, "chunk_index": i }),
        })
        .collect();

    // One provider round trip per batch_size chunks
    let mut written = 0u64;
    for batch in records.chunks(config.embedding.batch_size.max(1)) {
        index.upsert_batch(Partition::Fulltext, batch).await?;
        written += batch.len() as u64;
    }

    if let Some(ref abstract_text) = paper.abstract_text {
        index
            .upsert(
                Partition::Abstract,
                &vector::abstract_record_id(paper_id),
                paper_id,
                abstract_text,
                serde_json::json!({ "paper_id": paper_id }),
            )
            .await?;
        written += 1;
    }

    Ok(written)
}

/// A single `.pdf` file, or every `.pdf` under a directory (sorted for
/// deterministic import order).
fn collect_pdfs(path: &Path) -> Result<Vec<PathBuf>> {
    let meta = std::fs::metadata(path)
        .with_context(|| format!("Cannot access {}", path.display()))?;

    if meta.is_file() {
        if !is_pdf(path) {
            bail!("{} is not a PDF file", path.display());
        }
        return Ok(vec![path.to_path_buf()]);
    }

    let mut pdfs: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_pdf(e.path()))
        .map(|e| e.into_path())
        .collect();
    pdfs.sort();
    Ok(pdfs)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbConfig;
    use crate::testutil::{memory_pool, CountingEmbedder};

    fn test_config() -> Config {
        let mut config = Config {
            db: DbConfig {
                path: "unused.sqlite".into(),
            },
            chunking: Default::default(),
            retrieval: Default::default(),
            embedding: Default::default(),
            llm: Default::default(),
        };
        config.chunking.chunk_size = 40;
        config.chunking.chunk_overlap = 0;
        config.embedding.batch_size = 2;
        config
    }

    #[tokio::test]
    async fn embed_paper_writes_chunks_and_abstract_in_batches() {
        let config = test_config();
        let pool = memory_pool().await;
        let index = SqliteVectorIndex::new(pool, Box::new(CountingEmbedder));

        let paper = NewPaper {
            title: "T".to_string(),
            authors: None,
            year: None,
            venue: None,
            abstract_text: Some("An abstract.".to_string()),
            raw_text: "raw".to_string(),
            markdown_text:
                "first paragraph words\n\nsecond paragraph words\n\nthird paragraph words"
                    .to_string(),
            content_hash: "h".to_string(),
            pdf_path: None,
        };

        // 3 chunks at this chunk_size plus the abstract record
        let written = embed_paper(&config, &index, "p1", &paper).await.unwrap();
        assert_eq!(written, 4);

        let fulltext = index
            .query(Partition::Fulltext, "paragraph words", 10)
            .await
            .unwrap();
        assert_eq!(fulltext.len(), 3);
        let abstracts = index
            .query(Partition::Abstract, "An abstract.", 10)
            .await
            .unwrap();
        assert_eq!(abstracts.len(), 1);
    }

    #[test]
    fn collect_pdfs_walks_directories_sorted() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("nested")).unwrap();
        std::fs::write(tmp.path().join("b.pdf"), b"x").unwrap();
        std::fs::write(tmp.path().join("nested/a.PDF"), b"x").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"x").unwrap();

        let pdfs = collect_pdfs(tmp.path()).unwrap();
        let names: Vec<String> = pdfs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["b.pdf", "a.PDF"]);
    }

    #[test]
    fn collect_pdfs_rejects_non_pdf_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let txt = tmp.path().join("notes.txt");
        std::fs::write(&txt, b"x").unwrap();
        assert!(collect_pdfs(&txt).is_err());
    }

    #[test]
    fn collect_pdfs_missing_path_errors() {
        assert!(collect_pdfs(Path::new("/nonexistent/place")).is_err());
    }
}
