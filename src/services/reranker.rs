//! Relevance reranker: second-pass semantic refinement of retrieval
//! candidates.
//!
//! Fetches one embedding for the query and one per candidate concurrently,
//! then fuses cosine similarity with the original retrieval score. Reranking
//! is a best-effort refinement, never a hard dependency: every failure mode
//! degrades to the original candidate order.

use std::cmp::Ordering;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::domain::models::candidate::RetrievalCandidate;
use crate::domain::ports::EmbeddingClient;

/// Weight of the original retrieval score in the fused score.
const ORIGINAL_WEIGHT: f32 = 0.3;
/// Weight of the rerank similarity in the fused score.
const RERANK_WEIGHT: f32 = 0.7;

/// Cosine similarity between two vectors; 0 if either has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Refines candidate ordering with an independently-fetched semantic signal.
pub struct RelevanceReranker {
    embedding: Arc<dyn EmbeddingClient>,
    /// Character budget applied to candidate content before embedding, to
    /// bound request cost.
    content_budget: usize,
}

impl RelevanceReranker {
    /// Create a reranker over the given embedding client.
    pub fn new(embedding: Arc<dyn EmbeddingClient>, content_budget: usize) -> Self {
        Self {
            embedding,
            content_budget,
        }
    }

    /// Rerank `candidates` against `query`, returning at most `top_k`.
    ///
    /// All per-candidate embedding calls are issued concurrently with the
    /// query embedding; the fan-out width is unbounded by candidate count,
    /// which is fine for the expected top_k of at most ~15. Per-candidate
    /// failures keep the candidate with similarity 0 and its original score;
    /// a failed query embedding abandons reranking wholesale.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RetrievalCandidate>,
        top_k: usize,
    ) -> Vec<RetrievalCandidate> {
        if candidates.is_empty() {
            return candidates;
        }

        let truncated_contents: Vec<String> = candidates
            .iter()
            .map(|candidate| candidate.content.chars().take(self.content_budget).collect())
            .collect();

        let query_future = self.embedding.embed(query);
        let candidate_futures = truncated_contents
            .iter()
            .map(|content| self.embedding.embed(content));

        let (query_result, candidate_results) =
            tokio::join!(query_future, join_all(candidate_futures));

        let query_vector = match query_result {
            Ok(vector) => vector,
            Err(e) => {
                warn!("query embedding failed, keeping original order: {e}");
                return truncated(candidates, top_k);
            }
        };

        let mut scored: Vec<RetrievalCandidate> = candidates
            .into_iter()
            .zip(candidate_results)
            .map(|(mut candidate, result)| {
                let original = candidate.score;
                let (similarity, fused) = match result {
                    Ok(vector) => {
                        let similarity = cosine_similarity(&query_vector, &vector);
                        (
                            similarity,
                            RERANK_WEIGHT.mul_add(similarity, ORIGINAL_WEIGHT * original),
                        )
                    }
                    Err(e) => {
                        // A failed fetch keeps the candidate at its retrieval
                        // score, never a similarity-weighted value.
                        debug!(id = %candidate.id, "candidate embedding failed: {e}");
                        (0.0, original)
                    }
                };
                candidate.original_score = Some(original);
                candidate.rerank_score = Some(similarity);
                candidate.score = fused;
                candidate
            })
            .collect();

        // Stable sort: ties preserve original relative order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        truncated(scored, top_k)
    }
}

fn truncated(mut candidates: Vec<RetrievalCandidate>, top_k: usize) -> Vec<RetrievalCandidate> {
    candidates.truncate(top_k);
    candidates
}
