//! History and clear command handlers.

use clap::Args;
use compass_core::{AppConfig, AppResult};
use compass_knowledge::open_memory;

/// Show the recent conversation for a user
#[derive(Args, Debug)]
pub struct HistoryCommand {
    /// Conversation key
    #[arg(short, long)]
    pub user: Option<String>,

    /// Number of messages to show
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl HistoryCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing history command");

        let memory = open_memory(config, self.user.as_deref())?;
        let messages = memory.messages();
        let start = messages.len().saturating_sub(self.limit);
        let recent = &messages[start..];

        if self.json {
            println!("{}", serde_json::to_string_pretty(recent)?);
            return Ok(());
        }

        if recent.is_empty() {
            println!("No conversation history ({})", memory.path().display());
            return Ok(());
        }

        for message in recent {
            println!("[{}] {}: {}", message.timestamp, message.role, message.content);
        }

        Ok(())
    }
}

/// Delete the conversation history for a user
#[derive(Args, Debug)]
pub struct ClearCommand {
    /// Conversation key
    #[arg(short, long)]
    pub user: Option<String>,
}

impl ClearCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing clear command");

        let mut memory = open_memory(config, self.user.as_deref())?;
        memory.clear()?;

        println!("Conversation memory cleared ({})", memory.path().display());
        Ok(())
    }
}
