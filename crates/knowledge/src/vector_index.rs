//! Vector index abstraction for document chunks.

use crate::types::{DocumentChunk, IndexMetric, IndexStats};
use rights_core::AppResult;

/// Trait for vector index backends.
///
/// The retrieval path only calls `metric`, `search` and `stats`; writes
/// belong to the ingestion pipeline.
pub trait VectorIndex: Send + Sync {
    /// Metric the index scores with. Decides the score orientation.
    fn metric(&self) -> IndexMetric;

    /// Return up to `top_k` chunks nearest to the query embedding,
    /// best score first. Ties are broken by chunk id.
    fn search(&self, query_embedding: &[f32], top_k: usize)
        -> AppResult<Vec<(DocumentChunk, f32)>>;

    /// Insert or replace a chunk. The chunk must carry an embedding.
    fn upsert_chunk(&self, chunk: &DocumentChunk) -> AppResult<()>;

    fn stats(&self) -> AppResult<IndexStats>;
}
