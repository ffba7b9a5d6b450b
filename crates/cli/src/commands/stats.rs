//! Stats and reset command handlers.

use super::open_corpus;
use clap::Args;
use compass_core::{AppConfig, AppError, AppResult};
use compass_knowledge::{open_memory, Role};

/// Show corpus and conversation statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Conversation key whose history is counted
    #[arg(short, long)]
    pub user: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let stats = open_corpus(config)?.stats();
        let memory = open_memory(config, self.user.as_deref())?;
        let questions = memory
            .messages()
            .iter()
            .filter(|m| m.role == Role::User)
            .count();

        if self.json {
            let output = serde_json::json!({
                "corpus": stats,
                "history": {
                    "path": memory.path(),
                    "messages": memory.len(),
                    "questions": questions,
                },
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("Corpus: {}", stats.store_path.display());
        println!("  Fragments:         {}", stats.fragments);
        println!("  Indexed vectors:   {}", stats.indexed_vectors);
        if stats.unindexed_fragments > 0 {
            println!(
                "  Unindexed:         {} (run `compass reindex`)",
                stats.unindexed_fragments
            );
        }
        match stats.dimension {
            Some(d) => println!("  Dimension:         {}", d),
            None => println!("  Dimension:         -"),
        }
        println!("  File size:         {} bytes", stats.file_size_bytes);
        println!("History: {}", memory.path().display());
        println!("  Messages:          {}", memory.len());
        println!("  Questions:         {}", questions);

        Ok(())
    }
}

/// Delete the whole corpus
#[derive(Args, Debug)]
pub struct ResetCommand {
    /// Skip confirmation
    #[arg(short, long)]
    pub yes: bool,
}

impl ResetCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing reset command");

        if !self.yes {
            return Err(AppError::Config(
                "Refusing to delete the corpus without --yes".to_string(),
            ));
        }

        let mut engine = open_corpus(config)?;
        let fragments = engine.fragment_count();
        engine.reset()?;

        println!(
            "Deleted corpus {} ({} fragments)",
            engine.store_path().display(),
            fragments
        );
        Ok(())
    }
}
