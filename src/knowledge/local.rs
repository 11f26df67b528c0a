//! Offline knowledge base over the JSON snippet dataset
//!
//! Ranks entries by shared query terms. Used when no vector index is configured.

use crate::error::RagError;
use crate::knowledge::KnowledgeBase;
use crate::models::Snippet;
use crate::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// One dataset entry as written by the indexing job
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetEntry {
    pub doc_id: String,
    pub answer_snippet: String,
    #[serde(default)]
    pub source: Option<String>,
}

impl From<DatasetEntry> for Snippet {
    fn from(entry: DatasetEntry) -> Self {
        Snippet {
            id: entry.doc_id,
            text: entry.answer_snippet,
            source: entry.source,
        }
    }
}

pub struct LocalKnowledgeBase {
    snippets: Vec<Snippet>,
    /// Lowercased term set per snippet, same order as `snippets`
    terms: Vec<HashSet<String>>,
}

impl LocalKnowledgeBase {
    pub fn new(snippets: Vec<Snippet>) -> Self {
        let terms = snippets
            .iter()
            .map(|s| tokenize(&format!("{} {}", s.text, s.source.as_deref().unwrap_or(""))))
            .collect();

        Self { snippets, terms }
    }

    /// Load a dataset file: a JSON array of `{doc_id, answer_snippet, source}`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RagError::Dataset(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let kb = Self::from_json(&raw)?;
        info!(path = %path.display(), entries = kb.len(), "Loaded knowledge base dataset");
        Ok(kb)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let entries: Vec<DatasetEntry> = serde_json::from_str(raw)
            .map_err(|e| RagError::Dataset(format!("Invalid dataset JSON: {}", e)))?;

        Ok(Self::new(entries.into_iter().map(Snippet::from).collect()))
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }
}

#[async_trait]
impl KnowledgeBase for LocalKnowledgeBase {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Snippet>> {
        let query_terms = tokenize(query);

        let mut scored: Vec<(usize, usize)> = self
            .terms
            .iter()
            .enumerate()
            .map(|(idx, terms)| (idx, terms.intersection(&query_terms).count()))
            .filter(|(_, score)| *score > 0)
            .collect();

        // Stable: equal scores keep dataset order
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        let results: Vec<Snippet> = scored
            .into_iter()
            .take(k)
            .map(|(idx, _)| self.snippets[idx].clone())
            .collect();

        debug!(query = %query, k, hits = results.len(), "Local similarity search");
        Ok(results)
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(|t| t.to_lowercase())
        .collect()
}
