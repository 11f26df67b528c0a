//! Core data models for the answering loop

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Snippet =================
//

/// A retrieved unit of knowledge-base text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snippet {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Snippet {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// `[<id>] <text>`, the form generation prompts consume
    pub fn render(&self) -> String {
        format!("[{}] {}", self.id, self.text)
    }
}

//
// ================= Verdict =================
//

/// Decision of the review stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "verdict", content = "follow_up_query", rename_all = "lowercase")]
pub enum CritiqueVerdict {
    Complete,
    Refine(String),
}

impl CritiqueVerdict {
    pub fn is_complete(&self) -> bool {
        matches!(self, CritiqueVerdict::Complete)
    }

    /// Follow-up search string, present only under `Refine`
    pub fn follow_up_query(&self) -> Option<&str> {
        match self {
            CritiqueVerdict::Complete => None,
            CritiqueVerdict::Refine(query) => Some(query),
        }
    }
}

impl fmt::Display for CritiqueVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CritiqueVerdict::Complete => write!(f, "COMPLETE"),
            CritiqueVerdict::Refine(query) => write!(f, "REFINE:{}", query),
        }
    }
}

/// Raw review text plus the verdict parsed out of it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Review {
    pub verdict: CritiqueVerdict,
    pub raw_text: String,
}

//
// ================= Final Result =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagOutcome {
    pub run_id: Uuid,
    pub question: String,
    pub final_answer: String,
    pub verdict: CritiqueVerdict,
    pub review_text: String,
    pub draft: String,
    pub snippets_used: Vec<Snippet>,
    pub refine_rounds: u32,
    pub reasoning_trace: Vec<String>,
    pub completed_at: DateTime<Utc>,
    pub execution_time_ms: u64,
}
