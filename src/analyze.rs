//! LLM analysis extraction over stored papers.
//!
//! For each target paper the configured model is prompted for a strict
//! JSON extraction (research question, methodology, findings,
//! contributions, limitations, future work, keywords). The validated
//! result is persisted and a flattened summary is embedded into the
//! `analysis` partition so topical search can reach it.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::db;
use crate::embedding;
use crate::error::Error;
use crate::llm::{self, LlmClient};
use crate::models::{PaperAnalysis, Partition};
use crate::prompts;
use crate::store::{DocumentStore, SqliteStore};
use crate::vector::{self, SqliteVectorIndex, VectorIndex};

/// Paper text beyond this many chars is truncated before prompting.
const MAX_PROMPT_CHARS: usize = 8000;

pub async fn run_analyze(config: &Config, id: Option<String>, all: bool) -> Result<()> {
    if id.is_none() && !all {
        bail!("Specify --id <paper-id> or --all");
    }

    let client = llm::create_client(&config.llm)?;
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let index: Option<SqliteVectorIndex> = if config.embedding.is_enabled() {
        let provider = embedding::create_provider(&config.embedding)?;
        Some(SqliteVectorIndex::new(pool.clone(), provider))
    } else {
        None
    };

    let targets = match id {
        Some(id) => {
            let paper = store
                .get_paper(&id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Paper not found: {}", id)))?;
            vec![paper]
        }
        None => store.get_all_papers().await?,
    };

    let mut analyzed = 0u64;
    let mut skipped = 0u64;
    let mut failed = 0u64;

    for paper in &targets {
        if all && store.get_analysis(&paper.id).await?.is_some() {
            skipped += 1;
            continue;
        }

        match analyze_one(&store, index.as_ref(), client.as_ref(), paper).await {
            Ok(()) => {
                println!("  analyzed: {} ({})", paper.title, paper.id);
                analyzed += 1;
            }
            Err(e) => {
                eprintln!("Warning: analysis failed for {} ({}): {:#}", paper.title, paper.id, e);
                failed += 1;
            }
        }
    }

    println!("analyze ({})", client.model_name());
    println!("  papers analyzed: {}", analyzed);
    if skipped > 0 {
        println!("  already analyzed: {}", skipped);
    }
    if failed > 0 {
        println!("  failed: {}", failed);
    }
    println!("ok");

    pool.close().await;
    Ok(())
}

async fn analyze_one(
    store: &SqliteStore,
    index: Option<&SqliteVectorIndex>,
    client: &dyn LlmClient,
    paper: &crate::models::Paper,
) -> Result<()> {
    let text = if paper.markdown_text.trim().is_empty() {
        &paper.raw_text
    } else {
        &paper.markdown_text
    };
    let prompt = prompts::extraction_prompt(&truncated(text));

    let analysis: PaperAnalysis = llm::generate_structured(client, &prompt).await?;
    store
        .add_analysis(&paper.id, &analysis, &client.model_name())
        .await?;

    // Inline embedding (non-fatal)
    if let Some(index) = index {
        let result = index
            .upsert(
                Partition::Analysis,
                &vector::analysis_record_id(&paper.id),
                &paper.id,
                &analysis.summary_text(),
                serde_json::json!({ "paper_id": paper.id }),
            )
            .await;
        if let Err(e) = result {
            eprintln!(
                "Warning: analysis embedding failed for {}: {:#}",
                paper.id, e
            );
        }
    }

    Ok(())
}

fn truncated(text: &str) -> String {
    if text.chars().count() <= MAX_PROMPT_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_PROMPT_CHARS).collect();
    format!("{}\n...(text truncated)", cut)
}
