//! Learn and reindex command handlers.

use clap::Args;
use compass_core::{AppConfig, AppError, AppResult};
use compass_knowledge::{collect_documents, open_engine, IndexChange, IngestOutcome};
use std::path::PathBuf;
use std::time::Instant;

/// Add documents to the corpus
#[derive(Args, Debug)]
pub struct LearnCommand {
    /// Files or directories to ingest (pdf, md, html, txt)
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl LearnCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing learn command");
        let started = Instant::now();

        let mut engine = open_engine(config)?;
        let documents = collect_documents(&self.paths);
        if documents.is_empty() {
            return Err(AppError::Knowledge(format!(
                "No supported documents found in {:?}",
                self.paths
            )));
        }

        let mut results = Vec::with_capacity(documents.len());
        let mut fragments_added = 0;
        let mut failures = 0;

        for path in &documents {
            match engine.add_file(path).await {
                Ok(outcome) => {
                    fragments_added += outcome.fragments_added();
                    if !self.json {
                        print_outcome(path, &outcome);
                    }
                    results.push(serde_json::json!({
                        "path": path,
                        "outcome": outcome,
                    }));
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!("Failed to ingest {:?}: {}", path, e);
                    if !self.json {
                        eprintln!("✗ {}: {}", path.display(), e);
                    }
                    results.push(serde_json::json!({
                        "path": path,
                        "error": e.to_string(),
                    }));
                }
            }
        }

        let stats = engine.stats();
        let duration_secs = started.elapsed().as_secs_f64();

        if self.json {
            let output = serde_json::json!({
                "documents": results,
                "fragmentsAdded": fragments_added,
                "failures": failures,
                "corpus": stats,
                "durationSecs": duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Learned {} fragments from {} documents ({} failed) in {:.2}s; corpus holds {} fragments",
                fragments_added,
                documents.len() - failures,
                failures,
                duration_secs,
                stats.fragments
            );
        }

        if failures == documents.len() {
            return Err(AppError::Knowledge("No document could be ingested".to_string()));
        }

        Ok(())
    }
}

fn print_outcome(path: &std::path::Path, outcome: &IngestOutcome) {
    match outcome {
        IngestOutcome::Skipped { reason } => {
            println!("- {}: skipped ({:?})", path.display(), reason);
        }
        IngestOutcome::Indexed(report) => {
            println!("✓ {}: {} fragments", path.display(), report.fragments_added);
            match report.change {
                IndexChange::Appended => {}
                IndexChange::Rebuilt {
                    previous_dimension,
                    unindexed_fragments,
                } => println!(
                    "  index rebuilt ({} -> {} dims); {} older fragments unindexed, run `compass reindex`",
                    previous_dimension, report.dimension, unindexed_fragments
                ),
                IndexChange::Reembedded {
                    previous_dimension,
                    reembedded_fragments,
                } => println!(
                    "  index rebuilt ({} -> {} dims); re-embedded {} older fragments",
                    previous_dimension, report.dimension, reembedded_fragments
                ),
            }
        }
    }
}

/// Re-embed every stored fragment with the current embedding backend
#[derive(Args, Debug)]
pub struct ReindexCommand {}

impl ReindexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing reindex command");

        let mut engine = open_engine(config)?;
        let count = engine.reindex().await?;

        match engine.dimension() {
            Some(dimension) => println!("Reindexed {} fragments ({} dims)", count, dimension),
            None => println!("Corpus is empty; nothing to reindex"),
        }

        Ok(())
    }
}
