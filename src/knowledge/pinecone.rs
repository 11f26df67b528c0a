//! Pinecone-backed knowledge base
//!
//! Embeds the query, then runs a top-k query against the index host.
//! Snippet text lives in match metadata under `text`, ids under `doc_id`.

use crate::error::RagError;
use crate::knowledge::{Embedder, KnowledgeBase};
use crate::models::Snippet;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

const PINECONE_API_VERSION: &str = "2024-07";

pub struct PineconeKnowledgeBase {
    client: Client,
    index_host: String,
    api_key: String,
    embedder: Arc<dyn Embedder>,
}

impl PineconeKnowledgeBase {
    pub fn new(index_host: &str, api_key: String, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()?;

        let host = index_host.trim_end_matches('/');
        let index_host = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };

        Ok(Self {
            client,
            index_host,
            api_key,
            embedder,
        })
    }
}

#[async_trait]
impl KnowledgeBase for PineconeKnowledgeBase {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Snippet>> {
        let vector = self.embedder.embed(query).await?;

        let request = QueryRequest {
            vector,
            top_k: k,
            include_metadata: true,
        };

        let url = format!("{}/query", self.index_host);

        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Pinecone query failed: {}", e);
                RagError::KnowledgeBase(format!("Pinecone request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Pinecone error response: {}", error_text);
            return Err(RagError::KnowledgeBase(format!(
                "Pinecone returned {}: {}",
                status, error_text
            )));
        }

        let body: QueryResponse = response.json().await.map_err(|e| {
            RagError::KnowledgeBase(format!("Invalid Pinecone response: {}", e))
        })?;

        let snippets = snippets_from_matches(body.matches);
        debug!(query = %query, k, hits = snippets.len(), "Pinecone similarity search");

        Ok(snippets)
    }
}

/// Map ranked matches to snippets, skipping matches without text
fn snippets_from_matches(matches: Vec<Match>) -> Vec<Snippet> {
    matches
        .into_iter()
        .filter_map(|m| {
            let metadata = m.metadata.unwrap_or_default();
            let text = metadata.text.filter(|t| !t.trim().is_empty())?;

            Some(Snippet {
                id: metadata.doc_id.unwrap_or(m.id),
                text,
                source: metadata.source,
            })
        })
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
    vector: Vec<f32>,
    top_k: usize,
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<Match>,
}

#[derive(Debug, Deserialize)]
struct Match {
    id: String,
    #[serde(default)]
    metadata: Option<MatchMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct MatchMetadata {
    doc_id: Option<String>,
    text: Option<String>,
    source: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    struct FixedEmbedder;

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(RagError::Llm("embedding quota exceeded".to_string()))
        }
    }

    /// Serve `router` on an ephemeral local port, returning its base url
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.1, 0.2])
        }
    }

    #[test]
    fn test_query_request_serialization() {
        let request = QueryRequest {
            vector: vec![0.5],
            top_k: 5,
            include_metadata: true,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["topK"], 5);
        assert_eq!(json["includeMetadata"], true);
    }

    #[test]
    fn test_matches_to_snippets() {
        let raw = r#"{
            "matches": [
                {"id": "vec-1", "score": 0.91, "metadata": {"doc_id": "KB010", "text": "Retry with jitter.", "source": "errors"}},
                {"id": "vec-2", "score": 0.80, "metadata": {"text": "Log the request id."}},
                {"id": "vec-3", "score": 0.42}
            ],
            "namespace": ""
        }"#;

        let response: QueryResponse = serde_json::from_str(raw).unwrap();
        let snippets = snippets_from_matches(response.matches);

        assert_eq!(
            snippets,
            vec![
                Snippet::new("KB010", "Retry with jitter.").with_source("errors"),
                Snippet::new("vec-2", "Log the request id."),
            ]
        );
    }

    #[test]
    fn test_index_host_normalization() {
        let kb = PineconeKnowledgeBase::new(
            "rag-kb-abc123.svc.pinecone.io/",
            "key".to_string(),
            Arc::new(FixedEmbedder),
        )
        .unwrap();
        assert_eq!(kb.index_host, "https://rag-kb-abc123.svc.pinecone.io");
    }

    #[tokio::test]
    async fn test_embedder_error_passes_through() {
        // No server behind this host; the embedder fails before any request
        let kb = PineconeKnowledgeBase::new(
            "http://127.0.0.1:9",
            "key".to_string(),
            Arc::new(FailingEmbedder),
        )
        .unwrap();

        let err = kb.similarity_search("cache ttl", 5).await.unwrap_err();
        assert!(matches!(err, RagError::Llm(msg) if msg == "embedding quota exceeded"));
    }

    #[tokio::test]
    async fn test_error_status_is_knowledge_base_failure() {
        let router = Router::new().route(
            "/query",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "index warming up") }),
        );
        let host = serve(router).await;

        let kb = PineconeKnowledgeBase::new(&host, "key".to_string(), Arc::new(FixedEmbedder))
            .unwrap();

        let err = kb.similarity_search("cache ttl", 5).await.unwrap_err();
        match err {
            RagError::KnowledgeBase(msg) => {
                assert!(msg.contains("503"));
                assert!(msg.contains("index warming up"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_query_round_trip() {
        let router = Router::new().route(
            "/query",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers["api-key"], "pk-test");
                assert_eq!(headers["x-pinecone-api-version"], PINECONE_API_VERSION);
                assert_eq!(body["topK"], 1);
                assert_eq!(body["vector"].as_array().map(Vec::len), Some(2));
                assert_eq!(body["includeMetadata"], true);

                Json(json!({
                    "matches": [
                        {"id": "vec-7", "score": 0.88, "metadata": {"doc_id": "KB007", "text": "Set a TTL."}}
                    ]
                }))
            }),
        );
        let host = serve(router).await;

        let kb = PineconeKnowledgeBase::new(&host, "pk-test".to_string(), Arc::new(FixedEmbedder))
            .unwrap();

        let snippets = kb.similarity_search("cache ttl", 1).await.unwrap();
        assert_eq!(snippets, vec![Snippet::new("KB007", "Set a TTL.")]);
    }
}
