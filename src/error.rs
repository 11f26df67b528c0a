//! Error types for the retrieval-augmented answering loop

use thiserror::Error;

/// Result type alias for loop operations
pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {

    // =============================
    // Collaborator Failures
    // =============================

    #[error("Knowledge base error: {0}")]
    KnowledgeBase(String),

    #[error("LLM error: {0}")]
    Llm(String),

    // =============================
    // Local Errors
    // =============================

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid loop state: {0}")]
    InvalidState(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// True when the error came from the knowledge base or the language model
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            RagError::KnowledgeBase(_) | RagError::Llm(_) | RagError::Http(_)
        )
    }
}
