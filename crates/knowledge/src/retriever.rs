//! Query-to-matches retrieval: embed, search, filter by score.

use crate::embeddings::EmbeddingProvider;
use crate::types::ScoredMatch;
use crate::vector_index::VectorIndex;
use rights_core::AppError;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Failure of the embedding capability or of the index lookup.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Index search failed: {0}")]
    Index(String),
}

impl From<RetrievalError> for AppError {
    fn from(err: RetrievalError) -> Self {
        AppError::Knowledge(err.to_string())
    }
}

/// Turns a text query into scored document matches.
///
/// Both collaborators are injected; the retriever never writes to the index.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("embedder", &self.embedder.provider_name())
            .field("metric", &self.index.metric())
            .finish()
    }
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Retrieve up to `k` matches for `query`, nearest first.
    ///
    /// A blank query yields no matches. A `score_threshold` of 0 disables
    /// filtering; otherwise the threshold is applied in the orientation of
    /// the index metric.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredMatch>, RetrievalError> {
        let query = query.trim();
        if query.is_empty() {
            debug!("Blank query, skipping retrieval");
            return Ok(Vec::new());
        }

        let embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        let raw = self
            .index
            .search(&embedding, k)
            .map_err(|e| RetrievalError::Index(e.to_string()))?;
        let found = raw.len();

        let orientation = self.index.metric().orientation();
        let matches: Vec<ScoredMatch> = raw
            .into_iter()
            .filter(|(_, score)| orientation.passes(*score, score_threshold))
            .map(|(chunk, score)| ScoredMatch { chunk, score })
            .collect();

        info!(
            "Retrieved {} of {} matches (k={}, threshold={})",
            matches.len(),
            found,
            k,
            score_threshold
        );

        Ok(matches)
    }
}
