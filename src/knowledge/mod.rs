//! Knowledge base trait and implementations
//!
//! A knowledge base answers similarity queries with ranked snippets.
//! Index provisioning and ingestion happen elsewhere.

use crate::models::Snippet;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

pub mod local;
pub mod pinecone;

pub use local::LocalKnowledgeBase;
pub use pinecone::PineconeKnowledgeBase;

/// Trait for similarity search over the knowledge base
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Return up to `k` snippets ranked by relevance (possibly none)
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Snippet>>;
}

/// Trait for turning query text into an embedding vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Scripted knowledge base for development & testing.
/// Answers each query from a fixed table and records every call.
pub struct StaticKnowledgeBase {
    responses: HashMap<String, Vec<Snippet>>,
    fallback: Vec<Snippet>,
    calls: RwLock<Vec<(String, usize)>>,
}

impl StaticKnowledgeBase {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            fallback: Vec::new(),
            calls: RwLock::new(Vec::new()),
        }
    }

    /// Respond to `query` with `snippets`
    pub fn with_response(mut self, query: impl Into<String>, snippets: Vec<Snippet>) -> Self {
        self.responses.insert(query.into(), snippets);
        self
    }

    /// Respond to any unscripted query with `snippets`
    pub fn with_fallback(mut self, snippets: Vec<Snippet>) -> Self {
        self.fallback = snippets;
        self
    }

    /// Queries received so far, with their `k`
    pub async fn calls(&self) -> Vec<(String, usize)> {
        self.calls.read().await.clone()
    }
}

impl Default for StaticKnowledgeBase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KnowledgeBase for StaticKnowledgeBase {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Snippet>> {
        self.calls.write().await.push((query.to_string(), k));

        let snippets = self.responses.get(query).unwrap_or(&self.fallback);

        Ok(snippets.iter().take(k).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_kb_truncates_to_k() {
        let kb = StaticKnowledgeBase::new().with_response(
            "caching",
            vec![Snippet::new("KB1", "A"), Snippet::new("KB2", "B")],
        );

        let result = kb.similarity_search("caching", 1).await.unwrap();
        assert_eq!(result, vec![Snippet::new("KB1", "A")]);

        let unscripted = kb.similarity_search("other", 3).await.unwrap();
        assert!(unscripted.is_empty());

        assert_eq!(
            kb.calls().await,
            vec![("caching".to_string(), 1), ("other".to_string(), 3)]
        );
    }
}
