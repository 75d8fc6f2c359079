//! Stats command handler.

use clap::Args;
use rights_core::{config::AppConfig, AppResult};
use rights_knowledge::{open_index, VectorIndex};

/// Show embedding index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let index_path = config.index_path();
        let stats = open_index(config)?.stats()?;

        if self.json {
            let output = serde_json::json!({
                "index": index_path,
                "chunks": stats.chunks_count,
                "sources": stats.sources_count,
                "metric": stats.metric.as_str(),
                "embeddings": {
                    "provider": config.embeddings.provider,
                    "model": config.embeddings.model,
                    "dimensions": config.embeddings.dimensions,
                }
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("Index:      {}", index_path.display());
        println!("Chunks:     {}", stats.chunks_count);
        println!("Sources:    {}", stats.sources_count);
        println!("Metric:     {}", stats.metric.as_str());
        println!(
            "Embeddings: {} ({}, {} dims)",
            config.embeddings.provider, config.embeddings.model, config.embeddings.dimensions
        );

        Ok(())
    }
}
