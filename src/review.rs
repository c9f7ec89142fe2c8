//! Literature review synthesis over a retrieved subset.
//!
//! Hybrid-retrieves the papers most relevant to a topic, folds each one
//! into a numbered brief (metadata plus analysis fields when present),
//! and prompts the LLM for a structured review that cites briefs by
//! their `[n]` numbers. The numbered source list is printed after the
//! review so the citations resolve.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::embedding;
use crate::llm;
use crate::models::{PaperAnalysis, SearchHit};
use crate::prompts;
use crate::store::{DocumentStore, SqliteStore};
use crate::vector::SqliteVectorIndex;

/// Findings shown per brief.
const MAX_FINDINGS: usize = 3;

/// Contributions shown per brief.
const MAX_CONTRIBUTIONS: usize = 2;

pub async fn run_review(config: &Config, topic: &str, max_papers: usize) -> Result<()> {
    let client = llm::create_client(&config.llm)?;
    let provider = embedding::create_provider(&config.embedding)?;
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let index = SqliteVectorIndex::new(pool.clone(), provider);

    let hits = crate::hybrid::search(
        &index,
        &store,
        topic,
        max_papers,
        config.retrieval.semantic_weight,
        config.retrieval.keyword_weight,
    )
    .await?;

    if hits.is_empty() {
        println!("No papers found for topic: {}", topic);
        pool.close().await;
        return Ok(());
    }

    let mut briefs = Vec::with_capacity(hits.len());
    for hit in &hits {
        let analysis = store.get_analysis(&hit.paper.id).await?;
        briefs.push((hit, analysis));
    }

    let papers_info = build_papers_info(&briefs);
    let prompt = prompts::review_prompt(topic, &papers_info);
    let review = client
        .generate(&prompt, Some(prompts::REVIEW_SYSTEM_PROMPT))
        .await?;

    println!("{}", review.trim());
    println!();
    println!("Sources:");
    for (i, hit) in hits.iter().enumerate() {
        println!("{}", source_line(i + 1, hit));
    }

    pool.close().await;
    Ok(())
}

/// Render the numbered briefs block fed to the model.
fn build_papers_info(briefs: &[(&SearchHit, Option<PaperAnalysis>)]) -> String {
    let mut blocks = Vec::with_capacity(briefs.len());
    for (i, (hit, analysis)) in briefs.iter().enumerate() {
        let mut lines = vec![format!("[{}] {}", i + 1, hit.paper.title)];
        if let Some(ref authors) = hit.paper.authors {
            lines.push(format!("Authors: {}", authors));
        }
        if let Some(year) = hit.paper.year {
            lines.push(format!("Year: {}", year));
        }
        if let Some(analysis) = analysis {
            if !analysis.research_question.is_empty() {
                lines.push(format!("Research question: {}", analysis.research_question));
            }
            if !analysis.methodology.is_empty() {
                lines.push(format!("Methodology: {}", analysis.methodology));
            }
            if !analysis.main_findings.is_empty() {
                let findings: Vec<&str> = analysis
                    .main_findings
                    .iter()
                    .take(MAX_FINDINGS)
                    .map(String::as_str)
                    .collect();
                lines.push(format!("Main findings: {}", findings.join("; ")));
            }
            if !analysis.key_contributions.is_empty() {
                let contributions: Vec<&str> = analysis
                    .key_contributions
                    .iter()
                    .take(MAX_CONTRIBUTIONS)
                    .map(String::as_str)
                    .collect();
                lines.push(format!("Key contributions: {}", contributions.join("; ")));
            }
        }
        blocks.push(lines.join("\n"));
    }
    blocks.join("\n\n")
}

fn source_line(n: usize, hit: &SearchHit) -> String {
    let mut line = format!("  [{}] {}", n, hit.paper.title);
    if let Some(ref authors) = hit.paper.authors {
        line.push_str(&format!(" - {}", authors));
    }
    if let Some(year) = hit.paper.year {
        line.push_str(&format!(" ({})", year));
    }
    line
}
