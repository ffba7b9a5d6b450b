//! Ask command handler.
//!
//! Answers one question, using retrieved fragments and the user's recent
//! conversation as context, and records the turn.

use super::open_session;
use clap::Args;
use compass_core::{AppConfig, AppError, AppResult};

/// Ask a question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,

    /// Conversation key (one history file per user)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Answer without retrieving fragments from the corpus
    #[arg(long)]
    pub no_rag: bool,

    /// Number of fragments to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let question = self.question.join(" ");
        if question.trim().is_empty() {
            return Err(AppError::Config("No question provided".to_string()));
        }

        let mut session = open_session(config, self.user.as_deref())?;
        if let Some(top_k) = self.top_k {
            session = session.with_top_k(top_k);
        }

        let answer = session.ask(&question, !self.no_rag).await?;

        if self.json {
            let output = serde_json::json!({
                "question": question,
                "answer": answer,
                "user": self.user,
                "rag": !self.no_rag,
                "historyFile": session.memory().path(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", answer);
        }

        Ok(())
    }
}
