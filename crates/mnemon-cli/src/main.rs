//! Mnemon CLI - hybrid retrieval over a local corpus.
//!
//! # Usage
//!
//! ```bash
//! # Search the corpus
//! mnemon search "rust error handling"
//! mnemon search "query" -n 5 --fusion weighted --json
//!
//! # Assemble a citation-annotated context
//! mnemon search "query" --context
//!
//! # Build (or force-rebuild) the keyword index snapshot
//! mnemon build-index --force
//!
//! # Diagnostics
//! mnemon compare "query"
//! mnemon evaluate labels.json --k 10
//! ```

mod config;
mod corpus;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mnemon_core::evaluation::{evaluate, LabeledQuery, RelevanceJudgment};
use mnemon_core::search::{ContextBudget, FusionMethod, SearchOptions};
use mnemon_core::storage::IndexStore;
use serde::Deserialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Hybrid retrieval CLI: BM25 keyword search fused with vector similarity,
/// with reranking and citation-annotated context assembly.
#[derive(Parser)]
#[command(name = "mnemon", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Custom data directory (default: $MNEMON_DATA_DIR or ./.mnemon)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Search the corpus with hybrid retrieval
    Search {
        /// Search query
        query: String,

        /// Maximum number of results to return
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,

        /// Fusion strategy (rrf, weighted, max)
        #[arg(long, default_value = "rrf")]
        fusion: FusionMethod,

        /// Minimum fused score a result must reach
        #[arg(long, default_value = "0.0")]
        min_score: f32,

        /// Assemble a citation-annotated context instead of a result list
        #[arg(long)]
        context: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build the keyword index snapshot from the corpus
    BuildIndex {
        /// Rebuild even if a snapshot already exists
        #[arg(long)]
        force: bool,
    },

    /// Run a query vector-only and hybrid, side by side
    Compare {
        /// Search query
        query: String,

        /// Maximum number of results per view
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Measure retrieval quality against a labeled query file
    Evaluate {
        /// JSON file: [{ "query": "...", "relevant": ["id", ...] }, ...]
        labels: PathBuf,

        /// Cutoff for the @k metrics
        #[arg(long, default_value = "10")]
        k: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// One labeled query as stored in the evaluation file.
#[derive(Deserialize)]
struct LabelEntry {
    query: String,
    relevant: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let data_dir = config::data_dir(cli.data_dir.as_ref());
    let corpus_path = config::corpus_path(&data_dir);
    let index_path = config::index_path(&data_dir);

    match cli.command {
        Command::Search {
            query,
            limit,
            fusion,
            min_score,
            context,
            json,
        } => {
            let documents = corpus::load_corpus(&corpus_path)?;
            let engine = corpus::build_engine(&documents, &index_path)?;
            let options = SearchOptions {
                limit,
                min_score,
                fusion_method: fusion,
                ..SearchOptions::default()
            };

            if context {
                let (assembled, stats) = engine
                    .search_with_context(&query, &options, &ContextBudget::default())
                    .await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&assembled)?);
                } else {
                    println!(
                        "Context for \"{query}\" ({} chunks, ~{} tokens):\n",
                        assembled.entries.len(),
                        assembled.total_tokens
                    );
                    for entry in &assembled.entries {
                        println!("[{}] ({:.4})", entry.citation.reference, entry.score);
                        println!("{}\n", entry.text);
                    }
                    for note in &stats.degraded {
                        eprintln!("warning: degraded retrieval: {note}");
                    }
                }
            } else {
                let response = engine.search(&query, &options).await?;
                let text = if json {
                    output::format_json(&query, &response)
                } else {
                    output::format_human(&query, &response)
                };
                println!("{text}");
            }
        }

        Command::BuildIndex { force } => {
            let documents = corpus::load_corpus(&corpus_path)?;
            let store = IndexStore::new(&index_path);

            if store.exists() && !force {
                println!(
                    "Snapshot already exists at {} (use --force to rebuild)",
                    index_path.display()
                );
                return Ok(());
            }

            let (index, stats) = mnemon_core::search::Bm25Index::build(&documents);
            store.save(&index).context("Failed to persist index snapshot")?;
            println!(
                "Indexed {} documents ({} skipped) -> {}",
                stats.indexed,
                stats.skipped,
                index_path.display()
            );
        }

        Command::Compare { query, limit } => {
            let documents = corpus::load_corpus(&corpus_path)?;
            let engine = corpus::build_engine(&documents, &index_path)?;
            let options = SearchOptions {
                limit,
                ..SearchOptions::default()
            };
            let report = engine.compare(&query, &options).await?;
            println!("{}", output::format_comparison(&query, &report));
        }

        Command::Evaluate { labels, k, json } => {
            let documents = corpus::load_corpus(&corpus_path)?;
            let engine = corpus::build_engine(&documents, &index_path)?;

            let blob = std::fs::read(&labels)
                .with_context(|| format!("Failed to read labels: {}", labels.display()))?;
            let entries: Vec<LabelEntry> = serde_json::from_slice(&blob)
                .with_context(|| format!("Failed to parse labels: {}", labels.display()))?;

            let options = SearchOptions {
                limit: k,
                ..SearchOptions::default()
            };
            let mut labeled = Vec::with_capacity(entries.len());
            for entry in entries {
                let response = engine.search(&entry.query, &options).await?;
                labeled.push(LabeledQuery {
                    query: entry.query,
                    results: response
                        .results
                        .into_iter()
                        .map(|r| (r.id, r.score))
                        .collect(),
                    judgments: entry
                        .relevant
                        .into_iter()
                        .map(RelevanceJudgment::relevant)
                        .collect(),
                });
            }

            let report = evaluate(&labeled, k);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", output::format_eval(&report));
            }
        }
    }

    Ok(())
}
