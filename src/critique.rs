//! Review Critique Parser
//!
//! Turns free-text review output into a verdict:
//! - `COMPLETE...`            → accept the draft
//! - `REFINE...REFINE: <q>`   → supplementary retrieval with `<q>`
//! - anything else            → accept the draft
//!
//! Total over every input string; never fails.

use crate::models::CritiqueVerdict;
use tracing::{debug, warn};

const COMPLETE_TOKEN: &str = "COMPLETE";
const REFINE_TOKEN: &str = "REFINE";
const REFINE_DELIMITER: &str = "REFINE:";

/// Critique parser
pub struct CritiqueParser;

impl CritiqueParser {
    /// Parse a review completion into a verdict
    pub fn parse(review_text: &str) -> CritiqueVerdict {
        let text = review_text;

        if text.starts_with(COMPLETE_TOKEN) {
            debug!("Review accepted the draft");
            return CritiqueVerdict::Complete;
        }

        if text.starts_with(REFINE_TOKEN) {
            let query = text
                .find(REFINE_DELIMITER)
                .map(|idx| text[idx + REFINE_DELIMITER.len()..].trim())
                .unwrap_or("");

            debug!(follow_up_query = %query, "Review requested refinement");
            return CritiqueVerdict::Refine(query.to_string());
        }

        let prefix: String = text.chars().take(40).collect();
        warn!(review_prefix = %prefix, "Unrecognized review directive, accepting draft");
        CritiqueVerdict::Complete
    }
}
