//! Embedding capability.
//!
//! Turns text into vectors comparable with the vectors stored in the index.
//! The provider must match the one the ingestion pipeline used.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
