//! History command handler.

use clap::{Args, Subcommand};
use rights_agent::ChatHistory;
use rights_core::{config::AppConfig, AppResult};

/// Show or clear a chat session
#[derive(Args, Debug)]
pub struct HistoryCommand {
    #[command(subcommand)]
    pub action: HistoryAction,
}

#[derive(Subcommand, Debug)]
pub enum HistoryAction {
    /// Print a session's messages, oldest first
    Show {
        #[arg(long)]
        session: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a session's messages
    Clear {
        #[arg(long)]
        session: String,
    },
}

impl HistoryCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = ChatHistory::open(&config.history_path())?;

        match &self.action {
            HistoryAction::Show { session, json } => {
                let messages = store.load_messages(session)?;
                if *json {
                    println!("{}", serde_json::to_string_pretty(&messages)?);
                } else if messages.is_empty() {
                    println!("No messages in session '{}'", session);
                } else {
                    for message in messages {
                        println!(
                            "[{}] {}: {}",
                            message.created_at.format("%Y-%m-%d %H:%M:%S"),
                            message.role,
                            message.content
                        );
                    }
                }
            }
            HistoryAction::Clear { session } => {
                let removed = store.clear(session)?;
                tracing::info!("Cleared {} messages from session {}", removed, session);
                println!("Removed {} messages from session '{}'", removed, session);
            }
        }

        Ok(())
    }
}
