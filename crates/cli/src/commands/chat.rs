//! Interactive chat command handler.

use super::open_session;
use clap::Args;
use compass_core::{AppConfig, AppResult};
use compass_knowledge::ChatSession;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Start an interactive conversation
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Conversation key (one history file per user)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Answer without retrieving fragments from the corpus
    #[arg(long)]
    pub no_rag: bool,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let mut session = open_session(config, self.user.as_deref())?;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        println!(
            "Chatting as '{}' ({} fragments in corpus). Commands: /learn <path>, clear, exit",
            session.name(),
            session.engine().fragment_count()
        );

        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let input = line.trim();

            match input {
                "" => continue,
                "exit" | "quit" => break,
                "clear" => match session.clear_context() {
                    Ok(()) => println!("Conversation memory cleared."),
                    Err(e) => eprintln!("Failed to clear memory: {}", e),
                },
                _ => {
                    if let Some(path) = input.strip_prefix("/learn ") {
                        learn_file(&mut session, Path::new(path.trim())).await;
                        continue;
                    }

                    match session.ask(input, !self.no_rag).await {
                        Ok(answer) => println!("{}\n", answer),
                        Err(e) => {
                            tracing::error!("Question failed: {}", e);
                            eprintln!("Error: {}", e);
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Ingest a file mid-conversation; failures are reported and the chat goes on.
async fn learn_file(session: &mut ChatSession, path: &Path) {
    match session.engine_mut().add_file(path).await {
        Ok(outcome) => println!(
            "Learned {} fragments from {}",
            outcome.fragments_added(),
            path.display()
        ),
        Err(e) => {
            tracing::warn!("Failed to ingest {:?}: {}", path, e);
            eprintln!("Could not learn {}: {}", path.display(), e);
        }
    }
}
