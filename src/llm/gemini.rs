//! Gemini-backed language model and query embedder

use crate::gemini::GeminiClient;
use crate::knowledge::Embedder;
use crate::llm::LanguageModel;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Clone)]
pub struct GeminiModel {
    client: Arc<GeminiClient>,
}

impl GeminiModel {
    pub fn new(client: GeminiClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.client.generate(prompt).await
    }
}

#[async_trait]
impl Embedder for GeminiModel {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(text).await
    }
}
