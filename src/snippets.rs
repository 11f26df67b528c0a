//! Snippet accumulation for one question
//!
//! Append-only, order-preserving, deduplicated by snippet id (first seen wins).

use crate::knowledge::KnowledgeBase;
use crate::models::Snippet;
use crate::Result;
use std::collections::HashSet;
use tracing::debug;

pub struct SnippetStore<'a> {
    knowledge_base: &'a dyn KnowledgeBase,
    snippets: Vec<Snippet>,
    seen_ids: HashSet<String>,
}

impl<'a> SnippetStore<'a> {
    pub fn new(knowledge_base: &'a dyn KnowledgeBase) -> Self {
        Self {
            knowledge_base,
            snippets: Vec::new(),
            seen_ids: HashSet::new(),
        }
    }

    /// Search the knowledge base and merge new snippets into the store.
    /// Returns the search result as the knowledge base ranked it.
    pub async fn retrieve(&mut self, query: &str, k: usize) -> Result<Vec<Snippet>> {
        let (results, _) = self.search_and_merge(query, k).await?;
        Ok(results)
    }

    /// Like `retrieve`, but returns how many snippets were new to the store
    pub async fn supplement(&mut self, query: &str, k: usize) -> Result<usize> {
        let (_, added) = self.search_and_merge(query, k).await?;
        Ok(added)
    }

    async fn search_and_merge(&mut self, query: &str, k: usize) -> Result<(Vec<Snippet>, usize)> {
        let results = self.knowledge_base.similarity_search(query, k).await?;
        let added = self.merge(&results);

        debug!(
            query = %query,
            k,
            returned = results.len(),
            added,
            "Snippets retrieved"
        );

        Ok((results, added))
    }

    fn merge(&mut self, results: &[Snippet]) -> usize {
        let mut added = 0;
        for snippet in results {
            if self.seen_ids.insert(snippet.id.clone()) {
                self.snippets.push(snippet.clone());
                added += 1;
            }
        }
        added
    }

    /// All stored snippets in insertion order
    pub fn merged(&self) -> &[Snippet] {
        &self.snippets
    }

    /// Newline-joined `[<id>] <text>` lines, in store order
    pub fn render(&self) -> String {
        self.snippets
            .iter()
            .map(Snippet::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    pub fn into_snippets(self) -> Vec<Snippet> {
        self.snippets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::StaticKnowledgeBase;

    fn kb() -> StaticKnowledgeBase {
        StaticKnowledgeBase::new()
            .with_response(
                "caching",
                vec![Snippet::new("KB1", "A"), Snippet::new("KB2", "B")],
            )
            .with_response("ttl", vec![Snippet::new("KB2", "B (again)")])
            .with_response("eviction", vec![Snippet::new("KB3", "C")])
    }

    #[tokio::test]
    async fn test_retrieve_appends_in_order() {
        let kb = kb();
        let mut store = SnippetStore::new(&kb);

        let first = store.retrieve("caching", 5).await.unwrap();
        assert_eq!(first.len(), 2);

        store.retrieve("eviction", 1).await.unwrap();

        let ids: Vec<&str> = store.merged().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["KB1", "KB2", "KB3"]);
        assert_eq!(store.render(), "[KB1] A\n[KB2] B\n[KB3] C");
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_skipped() {
        let kb = kb();
        let mut store = SnippetStore::new(&kb);

        store.retrieve("caching", 5).await.unwrap();
        let before = store.merged().to_vec();

        // Returned unchanged, but contributes nothing new
        let returned = store.retrieve("ttl", 1).await.unwrap();
        assert_eq!(returned, vec![Snippet::new("KB2", "B (again)")]);

        assert_eq!(store.merged(), before.as_slice());
        assert_eq!(store.render(), "[KB1] A\n[KB2] B");

        store.retrieve("caching", 5).await.unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_retrieval_leaves_store_unchanged() {
        let kb = StaticKnowledgeBase::new();
        let mut store = SnippetStore::new(&kb);

        let results = store.retrieve("anything", 5).await.unwrap();
        assert!(results.is_empty());
        assert!(store.is_empty());
        assert_eq!(store.render(), "");
    }

    #[tokio::test]
    async fn test_supplement_counts_new_snippets() {
        let kb = kb();
        let mut store = SnippetStore::new(&kb);

        assert_eq!(store.supplement("caching", 5).await.unwrap(), 2);
        assert_eq!(store.supplement("ttl", 1).await.unwrap(), 0);
        assert_eq!(store.supplement("eviction", 1).await.unwrap(), 1);
        assert_eq!(store.len(), 3);
    }
}
