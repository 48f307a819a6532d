//! Retrieved passage candidates and vector collection status.

use serde::{Deserialize, Serialize};

/// A retrieved passage plus its relevance score.
///
/// `score` is mutable across stages: vector-store similarity first, then the
/// fused score once the reranker has run. The pre-rerank score and the raw
/// rerank similarity are retained for observability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalCandidate {
    /// Stable document/chunk identifier.
    pub id: String,
    /// Passage text.
    pub content: String,
    /// Arbitrary payload metadata (title, source, offsets, ...).
    pub metadata: serde_json::Value,
    /// Current relevance score for ordering.
    pub score: f32,
    /// Vector-store similarity before rerank fusion. Set by the reranker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_score: Option<f32>,
    /// Cosine similarity from the rerank pass. Set by the reranker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
}

impl RetrievalCandidate {
    /// Create a candidate as produced by the vector store.
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        metadata: serde_json::Value,
        score: f32,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata,
            score,
            original_score: None,
            rerank_score: None,
        }
    }

    /// Title from the payload metadata, if present.
    pub fn title(&self) -> Option<&str> {
        self.metadata.get("title").and_then(|t| t.as_str())
    }
}

/// Status snapshot of the backing vector collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Collection name.
    pub name: String,
    /// Number of indexed vectors.
    pub vectors_count: u64,
    /// Number of stored points.
    pub points_count: u64,
    /// Collection status as reported by the store.
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_from_metadata() {
        let candidate = RetrievalCandidate::new(
            "T0251:3",
            "passage text",
            serde_json::json!({"title": "Heart Sutra"}),
            0.82,
        );
        assert_eq!(candidate.title(), Some("Heart Sutra"));
    }

    #[test]
    fn test_optional_scores_omitted_from_json() {
        let candidate = RetrievalCandidate::new("a", "b", serde_json::json!({}), 0.5);
        let json = serde_json::to_value(&candidate).unwrap();
        assert!(json.get("original_score").is_none());
        assert!(json.get("rerank_score").is_none());
    }
}
