//! Prompts command handler.

use clap::Args;
use rights_core::{config::AppConfig, AppResult};
use rights_prompt::list_prompts;

/// List built-in and workspace prompts
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PromptsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let prompts = list_prompts(&config.workspace)?;

        if self.json {
            let output: Vec<_> = prompts
                .iter()
                .map(|(id, origin)| serde_json::json!({ "id": id, "origin": origin.as_str() }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        for (id, origin) in prompts {
            println!("{:<28} {}", id, origin.as_str());
        }
        Ok(())
    }
}
