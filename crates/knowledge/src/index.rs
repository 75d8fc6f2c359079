//! SQLite-backed vector index for document chunks.

use crate::types::{DocumentChunk, IndexMetric, IndexStats};
use crate::vector_index::VectorIndex;
use rights_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS chunks (
        id TEXT PRIMARY KEY,
        text TEXT NOT NULL,
        source TEXT NOT NULL,
        document_type TEXT NOT NULL,
        title TEXT NOT NULL,
        embedding BLOB NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source);
"#;

/// Brute-force vector index stored in a single SQLite table.
///
/// Every search scans all rows; adequate for the few thousand chunks a
/// country-report corpus produces.
pub struct SqliteIndex {
    conn: Mutex<Connection>,
    metric: IndexMetric,
}

impl std::fmt::Debug for SqliteIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteIndex")
            .field("metric", &self.metric)
            .finish_non_exhaustive()
    }
}

impl SqliteIndex {
    /// Open (or create) the index database at `db_path`.
    pub fn open(db_path: &Path, metric: IndexMetric) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::Knowledge(format!("Failed to create index directory: {}", e))
                })?;
            }
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;
        let index = Self::from_connection(conn, metric)?;

        tracing::debug!("Opened SQLite index at {:?} ({})", db_path, metric.as_str());
        Ok(index)
    }

    pub fn in_memory(metric: IndexMetric) -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;
        Self::from_connection(conn, metric)
    }

    fn from_connection(conn: Connection, metric: IndexMetric) -> AppResult<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;
        Ok(Self {
            conn: Mutex::new(conn),
            metric,
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Knowledge("Index connection lock poisoned".to_string()))
    }

    fn score(&self, query: &[f32], stored: &[f32]) -> f32 {
        match self.metric {
            IndexMetric::Cosine => cosine_similarity(query, stored),
            IndexMetric::L2 => l2_distance(query, stored),
        }
    }
}

impl VectorIndex for SqliteIndex {
    fn metric(&self) -> IndexMetric {
        self.metric
    }

    fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> AppResult<Vec<(DocumentChunk, f32)>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, text, source, document_type, title, embedding FROM chunks")
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                let embedding_bytes: Vec<u8> = row.get(5)?;
                Ok((
                    DocumentChunk {
                        id: row.get(0)?,
                        text: row.get(1)?,
                        source: row.get(2)?,
                        document_type: row.get(3)?,
                        title: row.get(4)?,
                        embedding: None,
                    },
                    embedding_bytes,
                ))
            })
            .map_err(|e| AppError::Knowledge(format!("Failed to query chunks: {}", e)))?;

        let mut results = Vec::new();
        for row in rows {
            let (mut chunk, bytes) =
                row.map_err(|e| AppError::Knowledge(format!("Failed to read chunk: {}", e)))?;
            let embedding = bytes_to_embedding(&bytes)?;
            if embedding.len() != query_embedding.len() {
                tracing::warn!(
                    "Skipping chunk {} with {} dimensions (query has {})",
                    chunk.id,
                    embedding.len(),
                    query_embedding.len()
                );
                continue;
            }
            let score = self.score(query_embedding, &embedding);
            chunk.embedding = Some(embedding);
            results.push((chunk, score));
        }

        let orientation = self.metric.orientation();
        results.sort_by(|a, b| orientation.best_first(a.1, b.1).then_with(|| a.0.id.cmp(&b.0.id)));
        results.truncate(top_k);

        tracing::debug!(
            "Retrieved {} chunks (requested top-{})",
            results.len(),
            top_k
        );

        Ok(results)
    }

    fn upsert_chunk(&self, chunk: &DocumentChunk) -> AppResult<()> {
        let embedding = chunk
            .embedding
            .as_ref()
            .ok_or_else(|| AppError::Knowledge(format!("Chunk {} missing embedding", chunk.id)))?;

        self.lock()?
            .execute(
                "INSERT OR REPLACE INTO chunks (id, text, source, document_type, title, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    chunk.id,
                    chunk.text,
                    chunk.source,
                    chunk.document_type,
                    chunk.title,
                    embedding_to_bytes(embedding),
                ],
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to insert chunk: {}", e)))?;

        Ok(())
    }

    fn stats(&self) -> AppResult<IndexStats> {
        let conn = self.lock()?;
        let (chunks, sources): (i64, i64) = conn
            .query_row(
                "SELECT COUNT(*), COUNT(DISTINCT source) FROM chunks",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to count chunks: {}", e)))?;

        Ok(IndexStats {
            chunks_count: chunks as usize,
            sources_count: sources as usize,
            metric: self.metric,
        })
    }
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Cosine similarity; zero vectors score 0.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
