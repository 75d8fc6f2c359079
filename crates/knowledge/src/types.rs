//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};

/// A bounded slice of an ingested document, the unit of retrieval.
///
/// Chunks are written by the ingestion pipeline and never modified by
/// the retrieval path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Unique chunk identifier
    pub id: String,

    /// Text content
    pub text: String,

    /// Source identifier (file name, report slug or URL)
    pub source: String,

    /// Document type (e.g., "country_report", "csv_row")
    pub document_type: String,

    /// Title of the parent document
    pub title: String,

    /// Embedding vector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl DocumentChunk {
    /// Key used to cite this chunk: its source, or its id when the
    /// source is unknown.
    pub fn citation_key(&self) -> &str {
        if self.source.trim().is_empty() {
            &self.id
        } else {
            &self.source
        }
    }
}

/// Whether higher or lower scores mean "more relevant".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreOrientation {
    /// Similarity metric: higher is better
    HigherIsBetter,
    /// Distance metric: lower is better
    LowerIsBetter,
}

impl ScoreOrientation {
    /// Threshold test under this orientation. A zero threshold keeps
    /// every score.
    pub fn passes(&self, score: f32, threshold: f32) -> bool {
        if threshold == 0.0 {
            return true;
        }
        match self {
            Self::HigherIsBetter => score >= threshold,
            Self::LowerIsBetter => score <= threshold,
        }
    }

    /// Ordering that puts the best score first.
    pub fn best_first(&self, a: f32, b: f32) -> std::cmp::Ordering {
        let ord = a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal);
        match self {
            Self::HigherIsBetter => ord.reverse(),
            Self::LowerIsBetter => ord,
        }
    }
}

/// Metric an index uses to score stored chunks against a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMetric {
    /// Cosine similarity in [-1, 1]
    Cosine,
    /// Euclidean distance in [0, inf)
    L2,
}

impl IndexMetric {
    /// Parse a metric name from configuration.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cosine" => Some(Self::Cosine),
            "l2" | "euclidean" => Some(Self::L2),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::L2 => "l2",
        }
    }

    pub fn orientation(&self) -> ScoreOrientation {
        match self {
            Self::Cosine => ScoreOrientation::HigherIsBetter,
            Self::L2 => ScoreOrientation::LowerIsBetter,
        }
    }
}

/// A chunk paired with its score for one retrieval call.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredMatch {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Index statistics.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub chunks_count: usize,
    pub sources_count: usize,
    pub metric: IndexMetric,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_threshold() {
        let o = ScoreOrientation::HigherIsBetter;
        assert!(o.passes(0.8, 0.5));
        assert!(o.passes(0.5, 0.5));
        assert!(!o.passes(0.4, 0.5));
        assert!(o.passes(-0.9, 0.0));
    }

    #[test]
    fn test_distance_threshold() {
        let o = ScoreOrientation::LowerIsBetter;
        assert!(o.passes(0.2, 0.5));
        assert!(!o.passes(0.7, 0.5));
        assert!(o.passes(42.0, 0.0));
    }

    #[test]
    fn test_best_first_ordering() {
        let mut sims = vec![0.1, 0.9, 0.5];
        sims.sort_by(|a, b| ScoreOrientation::HigherIsBetter.best_first(*a, *b));
        assert_eq!(sims, vec![0.9, 0.5, 0.1]);

        let mut dists = vec![0.1, 0.9, 0.5];
        dists.sort_by(|a, b| ScoreOrientation::LowerIsBetter.best_first(*a, *b));
        assert_eq!(dists, vec![0.1, 0.5, 0.9]);
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!(IndexMetric::parse("COSINE"), Some(IndexMetric::Cosine));
        assert_eq!(IndexMetric::parse("l2"), Some(IndexMetric::L2));
        assert_eq!(IndexMetric::parse("dot"), None);
        assert_eq!(IndexMetric::L2.orientation(), ScoreOrientation::LowerIsBetter);
    }

    #[test]
    fn test_citation_key_falls_back_to_id() {
        let mut chunk = DocumentChunk {
            id: "chunk-7".to_string(),
            text: "text".to_string(),
            source: "  ".to_string(),
            document_type: "pdf".to_string(),
            title: "t".to_string(),
            embedding: None,
        };
        assert_eq!(chunk.citation_key(), "chunk-7");
        chunk.source = "dos-2023-iran.pdf".to_string();
        assert_eq!(chunk.citation_key(), "dos-2023-iran.pdf");
    }
}
