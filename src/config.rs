//! Environment configuration
//!
//! Reads variables after `.env` is loaded. Unset values fall back to defaults;
//! set values that fail to parse are errors.

use crate::agent::{LoopConfig, DEFAULT_INITIAL_K, DEFAULT_MAX_REFINE_ROUNDS, DEFAULT_REFINE_K};
use crate::error::RagError;
use crate::gemini::{GeminiClient, DEFAULT_EMBEDDING_MODEL, DEFAULT_MODEL};
use crate::knowledge::{KnowledgeBase, LocalKnowledgeBase, PineconeKnowledgeBase};
use crate::llm::GeminiModel;
use crate::Result;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_DATASET_PATH: &str = "self_critique_loop_dataset.json";
pub const DEFAULT_PORT: u16 = 8080;

/// Where snippets come from
#[derive(Debug, Clone, PartialEq)]
pub enum KnowledgeBaseConfig {
    Pinecone { index_host: String, api_key: String },
    Local { dataset_path: PathBuf },
}

#[derive(Debug, Clone)]
pub struct RagConfig {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub embedding_model: String,
    pub temperature: f32,
    pub knowledge_base: KnowledgeBaseConfig,
    pub loop_config: LoopConfig,
    pub port: u16,
}

impl RagConfig {
    /// Load `.env` (if present) and read the process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let knowledge_base = match (get("PINECONE_INDEX_HOST"), get("PINECONE_API_KEY")) {
            (Some(index_host), Some(api_key)) => KnowledgeBaseConfig::Pinecone { index_host, api_key },
            _ => KnowledgeBaseConfig::Local {
                dataset_path: get("KB_DATASET_PATH")
                    .unwrap_or_else(|| DEFAULT_DATASET_PATH.to_string())
                    .into(),
            },
        };

        let loop_config = LoopConfig::new(
            parse_or(&get, "RAG_INITIAL_K", DEFAULT_INITIAL_K)?,
            parse_or(&get, "RAG_REFINE_K", DEFAULT_REFINE_K)?,
            parse_or(&get, "RAG_MAX_REFINE_ROUNDS", DEFAULT_MAX_REFINE_ROUNDS)?,
        )?;

        let port = match get("PORT") {
            Some(_) => parse_or(&get, "PORT", DEFAULT_PORT)?,
            None => parse_or(&get, "API_PORT", DEFAULT_PORT)?,
        };

        Ok(Self {
            gemini_api_key: get("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            embedding_model: get("GEMINI_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            temperature: parse_or(&get, "GEMINI_TEMPERATURE", 0.0_f32)?,
            knowledge_base,
            loop_config,
            port,
        })
    }

    pub fn gemini_client(&self) -> Result<GeminiClient> {
        Ok(GeminiClient::new(self.gemini_api_key.clone())?
            .with_model(self.gemini_model.clone())
            .with_embedding_model(self.embedding_model.clone())
            .with_temperature(self.temperature))
    }

    /// Language model plus the knowledge base it answers from
    pub fn build_collaborators(&self) -> Result<(Arc<dyn KnowledgeBase>, Arc<GeminiModel>)> {
        let model = Arc::new(GeminiModel::new(self.gemini_client()?));

        let knowledge_base: Arc<dyn KnowledgeBase> = match &self.knowledge_base {
            KnowledgeBaseConfig::Pinecone { index_host, api_key } => {
                info!(index_host = %index_host, "Using Pinecone knowledge base");
                Arc::new(PineconeKnowledgeBase::new(
                    index_host,
                    api_key.clone(),
                    model.clone(),
                )?)
            }
            KnowledgeBaseConfig::Local { dataset_path } => {
                info!(path = %dataset_path.display(), "Using local knowledge base");
                Arc::new(LocalKnowledgeBase::from_file(dataset_path)?)
            }
        };

        Ok((knowledge_base, model))
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| RagError::Config(format!("{}={:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}
