//! Retrieval layer for the rights agent.
//!
//! Embeds queries, searches the SQLite embedding index, filters matches by
//! score and formats them into a cited context block.

pub mod context;
pub mod embeddings;
pub mod index;
pub mod retriever;
pub mod types;
pub mod vector_index;

// Re-export commonly used types
pub use context::{Context, ContextEntry, ContextFormatter, DEFAULT_CHUNK_CHARS, NO_CONTEXT};
pub use embeddings::{create_provider, EmbeddingProvider};
pub use index::SqliteIndex;
pub use retriever::{RetrievalError, Retriever};
pub use types::{DocumentChunk, IndexMetric, IndexStats, ScoreOrientation, ScoredMatch};
pub use vector_index::VectorIndex;

use rights_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;

/// Open the configured index.
pub fn open_index(config: &AppConfig) -> AppResult<SqliteIndex> {
    let metric = IndexMetric::parse(&config.retrieval.metric).ok_or_else(|| {
        AppError::Config(format!(
            "Unknown index metric '{}'",
            config.retrieval.metric
        ))
    })?;
    SqliteIndex::open(&config.index_path(), metric)
}

/// Build a retriever from configuration: embedding provider plus index.
pub fn build_retriever(config: &AppConfig) -> AppResult<Retriever> {
    let embedder = create_provider(&config.embeddings, config.embedding_endpoint())?;
    let index = open_index(config)?;

    tracing::debug!(
        "Retriever ready: embeddings={}/{}, metric={}",
        embedder.provider_name(),
        embedder.model_name(),
        index.metric().as_str()
    );

    Ok(Retriever::new(embedder, Arc::new(index)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.workspace = dir.path().to_path_buf();
        config.embeddings.provider = "trigram".to_string();
        config.embeddings.dimensions = 64;
        config
    }

    #[tokio::test]
    async fn test_build_retriever_on_empty_index() {
        let dir = TempDir::new().unwrap();
        let retriever = build_retriever(&config(&dir)).unwrap();

        let matches = retriever.retrieve("press freedom", 5, 0.0).await.unwrap();
        assert!(matches.is_empty());
        assert_eq!(retriever.index().stats().unwrap().chunks_count, 0);
    }

    #[tokio::test]
    async fn test_trigram_retrieval_finds_related_chunk() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let retriever = build_retriever(&config).unwrap();
        let embedder = create_provider(&config.embeddings, "").unwrap();

        for (id, text) in [
            ("a", "Journalists faced arbitrary detention and torture."),
            ("b", "Agricultural exports grew during the harvest season."),
        ] {
            let embedding = embedder.embed(text).await.unwrap();
            retriever
                .index()
                .upsert_chunk(&DocumentChunk {
                    id: id.to_string(),
                    text: text.to_string(),
                    source: format!("{}.pdf", id),
                    document_type: "pdf".to_string(),
                    title: id.to_string(),
                    embedding: Some(embedding),
                })
                .unwrap();
        }

        let matches = retriever
            .retrieve("detention of journalists", 1, 0.0)
            .await
            .unwrap();
        assert_eq!(matches[0].chunk.id, "a");
    }

    #[test]
    fn test_unknown_metric_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.retrieval.metric = "dot".to_string();
        assert!(open_index(&config).is_err());
    }
}
