//! Qdrant vector store adapter (REST).
//!
//! Implements the [`VectorStore`] port against the Qdrant HTTP API:
//! `points/query` for search, batched `points` upserts for ingestion, and
//! the collection endpoint for status.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::domain::errors::{RetrievalError, RetrievalResult};
use crate::domain::models::candidate::{CollectionInfo, RetrievalCandidate};
use crate::domain::models::config::VectorStoreSettings;
use crate::domain::ports::vector_store::{SearchFilters, VectorStore};

const UPSERT_BATCH_SIZE: usize = 100;

/// Derive a stable unsigned point id from a string document id.
///
/// Qdrant point ids are integers or UUIDs; chunk ids are strings, so they are
/// hashed (FNV-1a 64) and the original id is kept in the payload as `doc_id`.
/// Masked to the positive i64 range for compatibility with signed consumers.
fn point_id(doc_id: &str) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    for byte in doc_id.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash & 0x7fff_ffff_ffff_ffff
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    result: QueryResult,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    points: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    result: CollectionResult,
}

#[derive(Debug, Deserialize)]
struct CollectionResult {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    indexed_vectors_count: Option<u64>,
    #[serde(default)]
    points_count: Option<u64>,
}

/// Vector store backed by a Qdrant collection.
pub struct QdrantStore {
    client: reqwest::Client,
    base_url: String,
    collection: String,
}

impl QdrantStore {
    /// Create a store against the configured Qdrant endpoint.
    pub fn new(settings: &VectorStoreSettings) -> RetrievalResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| {
                RetrievalError::VectorStore(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: settings.url.trim_end_matches('/').to_string(),
            collection: settings.collection.clone(),
        })
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!("{}/collections/{}{}", self.base_url, self.collection, suffix)
    }

    fn build_filter(filters: &SearchFilters) -> Value {
        let must: Vec<Value> = filters
            .iter()
            .map(|(key, value)| json!({ "key": key, "match": { "value": value } }))
            .collect();
        json!({ "must": must })
    }

    fn candidate_from_point(point: ScoredPoint) -> RetrievalCandidate {
        let id = point
            .payload
            .get("doc_id")
            .and_then(Value::as_str)
            .map_or_else(|| point.id.to_string(), ToString::to_string);
        let content = point
            .payload
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let metadata: serde_json::Map<String, Value> = point
            .payload
            .into_iter()
            .filter(|(key, _)| key != "content" && key != "doc_id")
            .collect();

        RetrievalCandidate::new(id, content, Value::Object(metadata), point.score)
    }

    async fn check_status(response: reqwest::Response) -> RetrievalResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(RetrievalError::VectorStore(format!("HTTP {status}: {body}")))
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn upsert(
        &self,
        ids: &[String],
        vectors: &[Vec<f32>],
        payloads: &[Value],
    ) -> RetrievalResult<()> {
        let points: Vec<Value> = ids
            .iter()
            .zip(vectors.iter())
            .zip(payloads.iter())
            .map(|((doc_id, vector), payload)| {
                let mut payload = payload.as_object().cloned().unwrap_or_default();
                payload.insert("doc_id".to_string(), json!(doc_id));
                json!({
                    "id": point_id(doc_id),
                    "vector": vector,
                    "payload": payload,
                })
            })
            .collect();

        for batch in points.chunks(UPSERT_BATCH_SIZE) {
            let response = self
                .client
                .put(self.collection_url("/points"))
                .query(&[("wait", "true")])
                .json(&json!({ "points": batch }))
                .send()
                .await
                .map_err(|e| RetrievalError::VectorStore(e.to_string()))?;
            Self::check_status(response).await?;
        }

        debug!(count = points.len(), collection = %self.collection, "upserted points");
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        filters: Option<&SearchFilters>,
    ) -> RetrievalResult<Vec<RetrievalCandidate>> {
        let mut body = json!({
            "query": vector,
            "limit": top_k,
            "with_payload": true,
        });
        if let Some(filters) = filters {
            body["filter"] = Self::build_filter(filters);
        }

        let response = self
            .client
            .post(self.collection_url("/points/query"))
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::VectorStore(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::VectorStore(format!("malformed response: {e}")))?;

        Ok(parsed
            .result
            .points
            .into_iter()
            .map(Self::candidate_from_point)
            .collect())
    }

    async fn collection_info(&self) -> RetrievalResult<CollectionInfo> {
        let response = self
            .client
            .get(self.collection_url(""))
            .send()
            .await
            .map_err(|e| RetrievalError::VectorStore(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let parsed: CollectionResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::VectorStore(format!("malformed response: {e}")))?;

        Ok(CollectionInfo {
            name: self.collection.clone(),
            vectors_count: parsed.result.indexed_vectors_count.unwrap_or(0),
            points_count: parsed.result.points_count.unwrap_or(0),
            status: parsed
                .result
                .status
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_settings(url: &str) -> VectorStoreSettings {
        VectorStoreSettings {
            url: url.to_string(),
            collection: "corpus".to_string(),
            vector_dim: 3,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_point_id_is_stable_and_positive() {
        let a = point_id("T0251:chunk:0");
        let b = point_id("T0251:chunk:0");
        let c = point_id("T0251:chunk:1");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(i64::try_from(a).is_ok());
    }

    #[test]
    fn test_build_filter_shape() {
        let mut filters = SearchFilters::new();
        filters.insert("title".to_string(), json!("Heart Sutra"));
        let filter = QdrantStore::build_filter(&filters);
        assert_eq!(filter["must"][0]["key"], "title");
        assert_eq!(filter["must"][0]["match"]["value"], "Heart Sutra");
    }

    #[tokio::test]
    async fn test_search_maps_payload_to_candidates() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/collections/corpus/points/query")
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "result": { "points": [{
                        "id": 42,
                        "score": 0.91,
                        "payload": {
                            "doc_id": "T0251:3",
                            "content": "form is emptiness",
                            "title": "Heart Sutra"
                        }
                    }]}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let store = QdrantStore::new(&test_settings(&server.url())).unwrap();
        let candidates = store.search(&[0.1, 0.2, 0.3], 5, None).await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "T0251:3");
        assert_eq!(candidates[0].content, "form is emptiness");
        assert_eq!(candidates[0].title(), Some("Heart Sutra"));
        assert!((candidates[0].score - 0.91).abs() < f32::EPSILON);
        assert!(candidates[0].metadata.get("content").is_none());
    }

    #[tokio::test]
    async fn test_collection_info_defaults() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/collections/corpus")
            .with_status(200)
            .with_body(r#"{"result": {"status": "green", "points_count": 7}}"#)
            .create_async()
            .await;

        let store = QdrantStore::new(&test_settings(&server.url())).unwrap();
        let info = store.collection_info().await.unwrap();

        assert_eq!(info.status, "green");
        assert_eq!(info.points_count, 7);
        assert_eq!(info.vectors_count, 0);
    }

    #[tokio::test]
    async fn test_search_error_surfaces_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/collections/corpus/points/query")
            .with_status(503)
            .create_async()
            .await;

        let store = QdrantStore::new(&test_settings(&server.url())).unwrap();
        let err = store.search(&[0.0], 5, None).await.unwrap_err();
        assert!(matches!(err, RetrievalError::VectorStore(_)));
    }
}
