//! Query engine facade: the single retrieval entry point exposed to the
//! CLI.
//!
//! Holds the document store and vector index behind their traits and
//! dispatches by search mode. No cross-call state; every query is
//! independent, so concurrent callers only need the store and index to
//! support concurrent reads.

use crate::error::{Error, Result};
use crate::hybrid::{self, SearchFilters};
use crate::keyword;
use crate::models::{Paper, PaperAnalysis, PaperSummary, Partition, SearchHit};
use crate::semantic;
use crate::store::DocumentStore;
use crate::vector::VectorIndex;

/// Per-query knobs beyond the query text and result count. `Default`
/// gives plain fulltext search with the standard weights.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Partition for semantic mode. Ignored by hybrid/advanced, which
    /// always use fulltext.
    pub partition: Option<Partition>,
    pub semantic_weight: Option<f64>,
    pub keyword_weight: Option<f64>,
    /// Filters for advanced mode.
    pub filters: SearchFilters,
}

pub struct QueryEngine {
    store: Box<dyn DocumentStore>,
    index: Box<dyn VectorIndex>,
    semantic_weight: f64,
    keyword_weight: f64,
}

impl QueryEngine {
    pub fn new(store: Box<dyn DocumentStore>, index: Box<dyn VectorIndex>) -> Self {
        Self {
            store,
            index,
            semantic_weight: hybrid::DEFAULT_SEMANTIC_WEIGHT,
            keyword_weight: hybrid::DEFAULT_KEYWORD_WEIGHT,
        }
    }

    /// Override the default hybrid weights (from configuration).
    pub fn with_weights(mut self, semantic_weight: f64, keyword_weight: f64) -> Self {
        self.semantic_weight = semantic_weight;
        self.keyword_weight = keyword_weight;
        self
    }

    /// Dispatch a search by mode: `semantic`, `hybrid`, or `advanced`.
    /// Anything else fails with [`Error::InvalidArgument`]; modes are never
    /// silently defaulted. Keyword scoring participates through the hybrid
    /// merge (and has a standalone store-only path in the CLI) rather than
    /// as a facade mode of its own.
    pub async fn query(
        &self,
        text: &str,
        mode: &str,
        max_results: usize,
        options: &QueryOptions,
    ) -> Result<Vec<SearchHit>> {
        let semantic_weight = options.semantic_weight.unwrap_or(self.semantic_weight);
        let keyword_weight = options.keyword_weight.unwrap_or(self.keyword_weight);

        match mode {
            "semantic" => {
                let partition = options.partition.unwrap_or(Partition::Fulltext);
                semantic::search_papers(
                    self.index.as_ref(),
                    self.store.as_ref(),
                    text,
                    max_results,
                    partition,
                )
                .await
            }
            "hybrid" => {
                hybrid::search(
                    self.index.as_ref(),
                    self.store.as_ref(),
                    text,
                    max_results,
                    semantic_weight,
                    keyword_weight,
                )
                .await
            }
            "advanced" => {
                hybrid::advanced_search(
                    self.index.as_ref(),
                    self.store.as_ref(),
                    text,
                    &options.filters,
                    max_results,
                    semantic_weight,
                    keyword_weight,
                )
                .await
            }
            other => Err(Error::InvalidArgument(format!(
                "Unknown search mode: '{}'. Available: semantic, hybrid, advanced",
                other
            ))),
        }
    }

    /// Papers similar to a stored one, via the abstract partition.
    pub async fn find_similar(&self, paper_id: &str, n: usize) -> Result<Vec<SearchHit>> {
        semantic::search_similar_papers(self.index.as_ref(), self.store.as_ref(), paper_id, n)
            .await
    }

    /// A paper joined with its most recent analysis. An absent analysis
    /// is not an error; a missing paper is.
    pub async fn paper_with_analysis(
        &self,
        paper_id: &str,
    ) -> Result<(Paper, Option<PaperAnalysis>)> {
        let paper = self
            .store
            .get_paper(paper_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Paper not found: {}", paper_id)))?;
        let analysis = self.store.get_analysis(paper_id).await?;
        Ok((paper, analysis))
    }

    /// Lightweight projections of every paper, in insertion order, with
    /// keywords and research question attached when an analysis exists.
    pub async fn list_summaries(&self) -> Result<Vec<PaperSummary>> {
        collect_summaries(self.store.as_ref()).await
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }
}

// ============ CLI entry points ============

use crate::config::Config;
use crate::db;
use crate::embedding;
use crate::store::SqliteStore;
use crate::vector::SqliteVectorIndex;
use anyhow::bail;

/// Options coming straight off the CLI flags.
pub struct CliSearchArgs {
    pub mode: String,
    pub partition: Option<String>,
    pub limit: Option<usize>,
    pub semantic_weight: Option<f64>,
    pub keyword_weight: Option<f64>,
    pub year_from: Option<i64>,
    pub year_to: Option<i64>,
    pub authors: Vec<String>,
}

async fn build_engine(config: &Config) -> anyhow::Result<(QueryEngine, sqlx::SqlitePool)> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let provider = embedding::create_provider(&config.embedding)?;
    let index = SqliteVectorIndex::new(pool.clone(), provider);
    let engine = QueryEngine::new(Box::new(store), Box::new(index)).with_weights(
        config.retrieval.semantic_weight,
        config.retrieval.keyword_weight,
    );
    Ok((engine, pool))
}

pub async fn run_search(config: &Config, query: &str, args: CliSearchArgs) -> anyhow::Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    match args.mode.as_str() {
        "semantic" | "keyword" | "hybrid" | "advanced" => {}
        other => bail!(
            "Unknown search mode: {}. Use semantic, keyword, hybrid, or advanced.",
            other
        ),
    }

    let limit = args.limit.unwrap_or(config.retrieval.final_limit);
    let partition = match args.partition.as_deref() {
        None => None,
        Some(name) => Some(
            Partition::parse(name)
                .ok_or_else(|| anyhow::anyhow!(
                    "Unknown partition: '{}'. Available: fulltext, abstract, analysis",
                    name
                ))?,
        ),
    };

    let filters = SearchFilters {
        year_from: args.year_from,
        year_to: args.year_to,
        authors: args.authors,
    };
    // Any filter flag upgrades a plain hybrid query to advanced
    let mode = if args.mode == "hybrid" && !filters.is_empty() {
        "advanced".to_string()
    } else {
        args.mode
    };

    // Keyword mode runs against the store alone
    if mode == "keyword" {
        let pool = db::connect(config).await?;
        let store = SqliteStore::new(pool.clone());
        let hits = keyword::search(&store, query, limit).await?;
        print_hits(&hits);
        pool.close().await;
        return Ok(());
    }

    if !config.embedding.is_enabled() {
        bail!(
            "Mode '{}' requires embeddings. Set [embedding] provider in config.",
            mode
        );
    }

    let (engine, pool) = build_engine(config).await?;
    let options = QueryOptions {
        partition,
        semantic_weight: args.semantic_weight,
        keyword_weight: args.keyword_weight,
        filters,
    };
    let hits = engine.query(query, &mode, limit, &options).await?;
    print_hits(&hits);
    pool.close().await;
    Ok(())
}

pub async fn run_similar(config: &Config, id: &str, limit: Option<usize>) -> anyhow::Result<()> {
    if !config.embedding.is_enabled() {
        bail!("similar requires embeddings. Set [embedding] provider in config.");
    }
    let (engine, pool) = build_engine(config).await?;
    let hits = engine
        .find_similar(id, limit.unwrap_or(config.retrieval.final_limit))
        .await?;
    print_hits(&hits);
    pool.close().await;
    Ok(())
}

pub async fn run_show(config: &Config, id: &str) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());

    let paper = match store.get_paper(id).await? {
        Some(paper) => paper,
        None => {
            pool.close().await;
            eprintln!("Error: Paper not found: {}", id);
            std::process::exit(1);
        }
    };
    let analysis = store.get_analysis(id).await?;

    println!("--- Paper ---");
    println!("id:         {}", paper.id);
    println!("title:      {}", paper.title);
    if let Some(ref authors) = paper.authors {
        println!("authors:    {}", authors);
    }
    if let Some(year) = paper.year {
        println!("year:       {}", year);
    }
    if let Some(ref venue) = paper.venue {
        println!("venue:      {}", venue);
    }
    if let Some(ref path) = paper.pdf_path {
        println!("pdf:        {}", path);
    }
    println!("imported:   {}", format_ts(paper.created_at));
    println!();

    if let Some(ref abstract_text) = paper.abstract_text {
        println!("--- Abstract ---");
        println!("{}", abstract_text);
        println!();
    }

    match analysis {
        Some(a) => {
            println!("--- Analysis ---");
            if !a.research_question.is_empty() {
                println!("research question: {}", a.research_question);
            }
            if !a.methodology.is_empty() {
                println!("methodology: {}", a.methodology);
            }
            print_list("main findings", &a.main_findings);
            print_list("key contributions", &a.key_contributions);
            print_list("limitations", &a.limitations);
            if !a.future_work.is_empty() {
                println!("future work: {}", a.future_work);
            }
            if !a.keywords.is_empty() {
                println!("keywords: {}", a.keywords.join(", "));
            }
        }
        None => println!("(no analysis yet; run `ppb analyze --id {}`)", paper.id),
    }

    pool.close().await;
    Ok(())
}

pub async fn run_list(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());

    let summaries = collect_summaries(&store).await?;
    if summaries.is_empty() {
        println!("No papers imported yet.");
        pool.close().await;
        return Ok(());
    }

    for summary in &summaries {
        let year = summary
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "----".to_string());
        println!(
            "{}  {}  {}",
            year,
            summary.id,
            summary.title
        );
        if let Some(ref authors) = summary.authors {
            println!("      {}", authors);
        }
        if !summary.keywords.is_empty() {
            println!("      keywords: {}", summary.keywords.join(", "));
        }
    }
    println!();
    println!("{} paper(s)", summaries.len());

    pool.close().await;
    Ok(())
}

/// Summary projection over the whole store, insertion order preserved.
async fn collect_summaries(store: &dyn DocumentStore) -> Result<Vec<PaperSummary>> {
    let papers = store.get_all_papers().await?;
    let mut summaries = Vec::with_capacity(papers.len());
    for paper in papers {
        let analysis = store.get_analysis(&paper.id).await?;
        let (keywords, research_question) = match analysis {
            Some(a) => {
                let question = (!a.research_question.is_empty()).then(|| a.research_question);
                (a.keywords, question)
            }
            None => (Vec::new(), None),
        };
        summaries.push(PaperSummary {
            id: paper.id,
            title: paper.title,
            authors: paper.authors,
            year: paper.year,
            created_at: paper.created_at,
            keywords,
            research_question,
        });
    }
    Ok(summaries)
}

fn print_hits(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("No results.");
        return;
    }
    for (i, hit) in hits.iter().enumerate() {
        println!("{}. [{:.3}] {}", i + 1, hit.display_score(), hit.paper.title);
        if let Some(ref authors) = hit.paper.authors {
            println!("    authors: {}", authors);
        }
        if let Some(year) = hit.paper.year {
            println!("    year: {}", year);
        }
        let mut parts = Vec::new();
        if let Some(s) = hit.relevance_score {
            parts.push(format!("semantic {:.3}", s));
        }
        if let Some(s) = hit.keyword_score {
            parts.push(format!("keyword {:.3}", s));
        }
        if hit.final_score.is_some() && !parts.is_empty() {
            println!("    scores: {}", parts.join(", "));
        }
        println!("    id: {}", hit.paper.id);
        println!();
    }
}

fn print_list(label: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("{}:", label);
    for item in items {
        println!("  - {}", item);
    }
}

fn format_ts(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}
