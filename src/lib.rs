//! Agentic RAG
//!
//! A retrieval-augmented question answering loop that:
//! - Retrieves supporting snippets from a knowledge base
//! - Drafts an answer with a language model
//! - Reviews the draft and decides COMPLETE or REFINE
//! - Refines with supplementary retrieval, a bounded number of times
//!
//! LOOP:
//! RETRIEVE → DRAFT → REVIEW → REFINE? → DONE

pub mod agent;
pub mod api;
pub mod config;
pub mod critique;
pub mod error;
pub mod gemini;
pub mod knowledge;
pub mod llm;
pub mod models;
pub mod prompts;
pub mod snippets;

pub use error::{RagError, Result};

// Re-export common types
pub use agent::{LoopConfig, RagLoop};
pub use critique::CritiqueParser;
pub use models::*;
pub use snippets::SnippetStore;
