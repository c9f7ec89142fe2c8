//! Hybrid search: weighted merge of the semantic and keyword channels.
//!
//! Both channels over-fetch, each candidate list is normalized by its own
//! maximum score, and the normalized scores are merged per paper with
//! caller-supplied weights. Normalize-then-weight keeps one signal's raw
//! scale (unbounded keyword counts vs. a similarity near 1) from
//! dominating the merge purely through units, while the weights still
//! express relative trust in each signal.

use std::collections::HashMap;

use crate::error::Result;
use crate::keyword;
use crate::models::{Partition, SearchHit};
use crate::semantic;
use crate::store::DocumentStore;
use crate::vector::VectorIndex;

/// Default weight on the normalized semantic score.
pub const DEFAULT_SEMANTIC_WEIGHT: f64 = 0.7;

/// Default weight on the normalized keyword score.
pub const DEFAULT_KEYWORD_WEIGHT: f64 = 0.3;

/// Candidate over-fetch factor for the plain hybrid merge.
const OVERFETCH: usize = 2;

/// Wider over-fetch for filtered search, so post-filtering still has
/// enough candidates to fill the page.
const FILTERED_OVERFETCH: usize = 3;

/// Filters applied by [`advanced_search`]. A paper missing a filtered
/// field passes that filter; filters are not mandatory-field checks.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub year_from: Option<i64>,
    pub year_to: Option<i64>,
    /// Case-insensitive substrings, any-of semantics.
    pub authors: Vec<String>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.year_from.is_none() && self.year_to.is_none() && self.authors.is_empty()
    }

    fn passes(&self, hit: &SearchHit) -> bool {
        if let (Some(from), Some(year)) = (self.year_from, hit.paper.year) {
            if year < from {
                return false;
            }
        }
        if let (Some(to), Some(year)) = (self.year_to, hit.paper.year) {
            if year > to {
                return false;
            }
        }
        if !self.authors.is_empty() {
            let paper_authors = hit
                .paper
                .authors
                .as_deref()
                .unwrap_or("")
                .to_lowercase();
            if !self
                .authors
                .iter()
                .any(|a| paper_authors.contains(&a.to_lowercase()))
            {
                return false;
            }
        }
        true
    }
}

/// Merge semantic (fulltext partition) and keyword results for `query`.
///
/// Weights are not required to sum to 1. A paper present in only one
/// channel contributes only that term; the missing side scores 0 rather
/// than disqualifying it.
pub async fn search(
    index: &dyn VectorIndex,
    store: &dyn DocumentStore,
    query: &str,
    max_results: usize,
    semantic_weight: f64,
    keyword_weight: f64,
) -> Result<Vec<SearchHit>> {
    let fetch = OVERFETCH * max_results;
    let semantic_hits =
        semantic::search_papers(index, store, query, fetch, Partition::Fulltext).await?;
    let keyword_hits = keyword::search(store, query, fetch).await?;

    let mut merged = merge(semantic_hits, keyword_hits, semantic_weight, keyword_weight);
    merged.truncate(max_results);
    Ok(merged)
}

/// Hybrid search with post-filters. Filtering preserves the upstream
/// relevance order; survivors are not re-sorted.
pub async fn advanced_search(
    index: &dyn VectorIndex,
    store: &dyn DocumentStore,
    query: &str,
    filters: &SearchFilters,
    max_results: usize,
    semantic_weight: f64,
    keyword_weight: f64,
) -> Result<Vec<SearchHit>> {
    let candidates = search(
        index,
        store,
        query,
        FILTERED_OVERFETCH * max_results,
        semantic_weight,
        keyword_weight,
    )
    .await?;

    let mut survivors = Vec::new();
    for hit in candidates {
        if !filters.passes(&hit) {
            continue;
        }
        survivors.push(hit);
        if survivors.len() >= max_results {
            break;
        }
    }
    Ok(survivors)
}

/// Normalize both lists by their own maxima, then merge by paper id.
fn merge(
    semantic_hits: Vec<SearchHit>,
    keyword_hits: Vec<SearchHit>,
    semantic_weight: f64,
    keyword_weight: f64,
) -> Vec<SearchHit> {
    let semantic_hits = normalize(semantic_hits, |h| h.relevance_score, |h, s| {
        h.relevance_score = Some(s)
    });
    let keyword_hits = normalize(keyword_hits, |h| h.keyword_score, |h, s| {
        h.keyword_score = Some(s)
    });

    let mut by_id: HashMap<String, SearchHit> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for hit in semantic_hits {
        let score = hit.relevance_score.unwrap_or(0.0) * semantic_weight;
        let id = hit.paper.id.clone();
        by_id.insert(
            id.clone(),
            SearchHit {
                final_score: Some(score),
                ..hit
            },
        );
        order.push(id);
    }

    for hit in keyword_hits {
        let contribution = hit.keyword_score.unwrap_or(0.0) * keyword_weight;
        match by_id.get_mut(&hit.paper.id) {
            Some(existing) => {
                existing.keyword_score = hit.keyword_score;
                existing.final_score =
                    Some(existing.final_score.unwrap_or(0.0) + contribution);
            }
            None => {
                let id = hit.paper.id.clone();
                by_id.insert(
                    id.clone(),
                    SearchHit {
                        final_score: Some(contribution),
                        ..hit
                    },
                );
                order.push(id);
            }
        }
    }

    let mut merged: Vec<SearchHit> = order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect();
    merged.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    merged
}

/// Divide every score in the list by the list's maximum. Skipped when the
/// list is empty or the maximum is 0 (scores are already all 0).
fn normalize(
    mut hits: Vec<SearchHit>,
    get: impl Fn(&SearchHit) -> Option<f64>,
    set: impl Fn(&mut SearchHit, f64),
) -> Vec<SearchHit> {
    let max = hits
        .iter()
        .filter_map(&get)
        .fold(0.0_f64, f64::max);
    if max > 0.0 {
        for hit in &mut hits {
            let score = get(hit).unwrap_or(0.0);
            set(hit, score / max);
        }
    }
    hits
}
