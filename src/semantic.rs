//! Semantic search over the vector index.
//!
//! Queries one partition, collapses chunk-level neighbors to distinct
//! papers, and joins the survivors back to the document store. The index
//! returns neighbors in ascending distance, so the first chunk seen for a
//! paper is also its best one; `relevance_score = 1 - distance` of that
//! chunk. The score is a ranking signal, not a calibrated probability.

use crate::error::{Error, Result};
use crate::models::{Partition, SearchHit};
use crate::store::DocumentStore;
use crate::vector::VectorIndex;

/// Chunk-to-paper collapse over-fetch factor.
const OVERFETCH: usize = 2;

/// Query prefix length for similar-paper lookups, in chars.
const SIMILAR_QUERY_CHARS: usize = 2000;

/// Search one partition for papers matching `query`.
///
/// Empty queries return an empty list without touching the index. Paper
/// ids present in the index but missing from the store are dropped with
/// a warning; partial ingest makes that window expected, not fatal.
pub async fn search_papers(
    index: &dyn VectorIndex,
    store: &dyn DocumentStore,
    query: &str,
    max_results: usize,
    partition: Partition,
) -> Result<Vec<SearchHit>> {
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }

    let neighbors = index
        .query(partition, query, OVERFETCH * max_results)
        .await?;

    // First occurrence per paper wins: ascending distance means it is
    // that paper's best chunk.
    let mut ranked: Vec<(String, f64)> = Vec::new();
    for neighbor in &neighbors {
        let Some(paper_id) = neighbor.paper_id() else {
            continue;
        };
        if ranked.iter().any(|(id, _)| id == paper_id) {
            continue;
        }
        ranked.push((paper_id.to_string(), neighbor.distance));
        if ranked.len() >= max_results {
            break;
        }
    }

    let mut hits = Vec::with_capacity(ranked.len());
    for (paper_id, distance) in ranked {
        match store.get_paper(&paper_id).await? {
            Some(paper) => hits.push(SearchHit::semantic(paper, 1.0 - distance)),
            None => eprintln!(
                "Warning: index record references unknown paper {}, dropping",
                paper_id
            ),
        }
    }

    Ok(hits)
}

/// Find papers similar to a stored one via the abstract partition.
///
/// Abstracts are the most topically-concentrated signal, so they produce
/// less chunk-level noise than raw full text. The source paper is never
/// part of the result.
pub async fn search_similar_papers(
    index: &dyn VectorIndex,
    store: &dyn DocumentStore,
    paper_id: &str,
    max_results: usize,
) -> Result<Vec<SearchHit>> {
    let source = store
        .get_paper(paper_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Paper not found: {}", paper_id)))?;

    let text = if source.markdown_text.trim().is_empty() {
        &source.title
    } else {
        &source.markdown_text
    };
    let query: String = text.chars().take(SIMILAR_QUERY_CHARS).collect();

    let mut hits = search_papers(index, store, &query, max_results + 1, Partition::Abstract).await?;
    hits.retain(|hit| hit.paper.id != paper_id);
    hits.truncate(max_results);
    Ok(hits)
}
