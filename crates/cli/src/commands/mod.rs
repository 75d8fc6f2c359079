//! Command handlers for the Rights Agent CLI.

pub mod ask;
pub mod history;
pub mod prompts;
pub mod retrieve;
pub mod stats;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use history::HistoryCommand;
pub use prompts::PromptsCommand;
pub use retrieve::RetrieveCommand;
pub use stats::StatsCommand;
