//! Retrieve command handler.
//!
//! Shows what the retriever returns for a query, without generation.

use clap::Args;
use rights_core::{config::AppConfig, AppResult};
use rights_knowledge::{build_retriever, ScoredMatch};
use serde::Serialize;

const PREVIEW_CHARS: usize = 200;

/// Show the documents retrieved for a query
#[derive(Args, Debug)]
pub struct RetrieveCommand {
    /// The query to search for
    pub query: String,

    /// Number of documents to retrieve
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Score threshold (0 disables filtering)
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MatchView<'a> {
    id: &'a str,
    source: &'a str,
    document_type: &'a str,
    title: &'a str,
    score: f32,
    preview: String,
}

impl<'a> From<&'a ScoredMatch> for MatchView<'a> {
    fn from(m: &'a ScoredMatch) -> Self {
        Self {
            id: &m.chunk.id,
            source: &m.chunk.source,
            document_type: &m.chunk.document_type,
            title: &m.chunk.title,
            score: m.score,
            preview: preview(&m.chunk.text),
        }
    }
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &flat[..idx]),
        None => flat,
    }
}

impl RetrieveCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing retrieve command");

        let top_k = self.top_k.unwrap_or(config.retrieval.top_k);
        let threshold = self.threshold.unwrap_or(config.retrieval.score_threshold);

        let retriever = build_retriever(config)?;
        let matches = retriever.retrieve(&self.query, top_k, threshold).await?;

        let views: Vec<MatchView> = matches.iter().map(MatchView::from).collect();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&views)?);
            return Ok(());
        }

        if views.is_empty() {
            println!("No relevant documents found.");
            return Ok(());
        }

        for (i, view) in views.iter().enumerate() {
            println!("[{}] {} ({})", i + 1, view.source, view.document_type);
            println!("    Title: {}", view.title);
            println!("    Score: {:.4}", view.score);
            println!("    {}", view.preview);
            println!();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_and_flattens() {
        assert_eq!(preview("short\n\ntext"), "short text");
        let long = "word ".repeat(100);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
    }
}
