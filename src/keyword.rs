//! Keyword search: a lexical-overlap baseline layered under the semantic
//! signal.
//!
//! Scans every stored paper (no pagination; a known scale limitation of
//! this baseline, see the note on `search`) and scores lexical overlap
//! between query tokens and a bounded haystack. The scoring formula is
//! isolated in [`score_paper`] so an indexed text-search backend could
//! replace the scan without changing scores.

use crate::error::Result;
use crate::models::{Paper, SearchHit};
use crate::store::DocumentStore;

/// Flat score added once per query token found in the title.
const TITLE_BONUS: f64 = 3.0;

/// Score added per occurrence of a token in the haystack.
const OCCURRENCE_WEIGHT: f64 = 0.5;

/// How much raw text joins the haystack, in chars.
const RAW_TEXT_PREFIX: usize = 1000;

/// Search stored papers by lexical overlap with `query`.
///
/// Loads the whole store on every call; acceptable only because this is
/// an explicit baseline under the semantic channel. Zero-scoring papers
/// are excluded. Ties keep the store's insertion order, which is
/// deterministic.
pub async fn search(
    store: &dyn DocumentStore,
    query: &str,
    max_results: usize,
) -> Result<Vec<SearchHit>> {
    let tokens = tokenize(query);
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let papers = store.get_all_papers().await?;

    let mut scored: Vec<SearchHit> = papers
        .into_iter()
        .filter_map(|paper| {
            let score = score_paper(&tokens, &paper);
            (score > 0.0).then(|| SearchHit::keyword(paper, score))
        })
        .collect();

    // Stable sort preserves insertion order among equal scores
    scored.sort_by(|a, b| {
        b.keyword_score
            .partial_cmp(&a.keyword_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(max_results);

    Ok(scored)
}

/// Lowercase query words longer than 2 chars. Shorter tokens are
/// stopword-like noise and are dropped.
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(|w| w.to_lowercase())
        .collect()
}

/// Lexical-overlap score for one paper.
///
/// Per token: a flat title bonus when the token appears in the title,
/// plus an occurrence credit over the haystack (title + authors + raw
/// text prefix). The haystack includes the title, so title occurrences
/// count twice: once in the flat bonus, once in the occurrence sum.
/// That double counting matches the observed scoring behavior and is
/// pinned by a test.
pub fn score_paper(tokens: &[String], paper: &Paper) -> f64 {
    let title = paper.title.to_lowercase();
    let raw_prefix: String = paper.raw_text.chars().take(RAW_TEXT_PREFIX).collect();
    let haystack = format!(
        "{} {} {}",
        title,
        paper.authors.as_deref().unwrap_or("").to_lowercase(),
        raw_prefix.to_lowercase()
    );

    let mut score = 0.0;
    for token in tokens {
        let count = count_occurrences(&haystack, token);
        if count > 0 {
            if title.contains(token.as_str()) {
                score += TITLE_BONUS;
            }
            score += count as f64 * OCCURRENCE_WEIGHT;
        }
    }
    score
}

/// Non-overlapping substring occurrences.
fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut rest = haystack;
    while let Some(pos) = rest.find(needle) {
        count += 1;
        rest = &rest[pos + needle.len()..];
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPaper;
    use crate::store::{DocumentStore, SqliteStore};
    use crate::testutil::{memory_pool, sample_paper};

    fn paper_with(title: &str, authors: Option<&str>, raw_text: &str) -> Paper {
        Paper {
            id: "p".to_string(),
            title: title.to_string(),
            authors: authors.map(|a| a.to_string()),
            year: None,
            venue: None,
            abstract_text: None,
            raw_text: raw_text.to_string(),
            markdown_text: String::new(),
            content_hash: "h".to_string(),
            pdf_path: None,
            created_at: 0,
        }
    }

    #[test]
    fn tokenize_drops_short_words_and_lowercases() {
        assert_eq!(tokenize("A BIG of Deep nets"), vec!["big", "deep", "nets"]);
        assert!(tokenize("a of to").is_empty());
    }

    #[test]
    fn title_match_scores_bonus_plus_double_counted_occurrences() {
        // "deep learning" in the title, three more times in the text:
        // per token 3.0 bonus + 0.5 * 4 occurrences = 5.0, for both tokens
        let text = "deep learning is great. deep learning wins. deep learning again.";
        let paper = paper_with("Deep Learning for NLP", None, text);
        let tokens = tokenize("deep learning");
        assert_eq!(score_paper(&tokens, &paper), 10.0);
    }

    #[test]
    fn single_token_title_scenario_scores_five() {
        // 3.0 title bonus + 0.5 * 4 occurrences (title + three in text)
        let text = "deep models. deep nets. deep everything.";
        let paper = paper_with("Deep Learning for NLP", None, text);
        assert_eq!(score_paper(&tokenize("deep"), &paper), 5.0);
    }

    #[test]
    fn no_match_scores_zero() {
        let paper = paper_with("Graph Theory", None, "vertices and edges");
        assert_eq!(score_paper(&tokenize("deep learning"), &paper), 0.0);
    }

    #[test]
    fn body_only_match_gets_no_title_bonus() {
        let paper = paper_with("Graph Theory", None, "applications of deep learning here");
        let score = score_paper(&tokenize("deep"), &paper);
        assert_eq!(score, 0.5);
    }

    #[test]
    fn author_match_counts_in_haystack() {
        let paper = paper_with("Untitled", Some("Maria Santos"), "");
        assert_eq!(score_paper(&tokenize("santos"), &paper), 0.5);
    }

    #[test]
    fn raw_text_beyond_prefix_ignored() {
        let far = format!("{}santos", " ".repeat(RAW_TEXT_PREFIX));
        let paper = paper_with("Untitled", None, &far);
        assert_eq!(score_paper(&tokenize("santos"), &paper), 0.0);
    }

    #[tokio::test]
    async fn search_excludes_zero_scores_and_sorts_descending() {
        let store = SqliteStore::new(memory_pool().await);
        let mut deep = sample_paper("Deep Learning for NLP", "h1");
        deep.raw_text = "deep learning deep learning deep learning".to_string();
        store.add_paper(&deep).await.unwrap();
        store
            .add_paper(&sample_paper("Graph Theory", "h2"))
            .await
            .unwrap();
        let mut weak = sample_paper("Shallow Models", "h3");
        weak.raw_text = "one mention of learning".to_string();
        store.add_paper(&weak).await.unwrap();

        let hits = search(&store, "deep learning", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].paper.title, "Deep Learning for NLP");
        assert_eq!(hits[1].paper.title, "Shallow Models");
        assert!(hits[0].keyword_score.unwrap() > hits[1].keyword_score.unwrap());
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let store = SqliteStore::new(memory_pool().await);
        for (i, title) in ["Equal Entropy One", "Equal Entropy Two"].iter().enumerate() {
            let paper = NewPaper {
                raw_text: String::new(),
                ..sample_paper(title, &format!("h{}", i))
            };
            store.add_paper(&paper).await.unwrap();
        }

        let hits = search(&store, "entropy", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].paper.title, "Equal Entropy One");
        assert_eq!(hits[1].paper.title, "Equal Entropy Two");
    }

    #[tokio::test]
    async fn short_only_query_returns_empty() {
        let store = SqliteStore::new(memory_pool().await);
        store.add_paper(&sample_paper("AI", "h1")).await.unwrap();
        let hits = search(&store, "a of", 10).await.unwrap();
        assert!(hits.is_empty());
    }
}
