//! Language model trait and implementations
//!
//! The loop only needs prompt-in, text-out completion.

use crate::error::RagError;
use crate::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::RwLock;

pub mod gemini;
pub use gemini::GeminiModel;

/// Trait for text completion (stateless, one call per prompt)
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Scripted model for development & testing.
/// Replies from a queue in order and records every prompt.
pub struct ScriptedModel {
    replies: RwLock<VecDeque<Result<String>>>,
    prompts: RwLock<Vec<String>>,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: RwLock::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            prompts: RwLock::new(Vec::new()),
        }
    }

    /// Queue a failure; it is returned when its turn comes
    pub fn then_fail(mut self, message: impl Into<String>) -> Self {
        self.replies
            .get_mut()
            .push_back(Err(RagError::Llm(message.into())));
        self
    }

    /// Prompts received so far, in call order
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.read().await.clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.write().await.push(prompt.to_string());

        self.replies
            .write()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(RagError::Llm("Scripted model has no replies left".to_string())))
    }
}
