//! Prompt construction for the draft, review, and refine stages

const NO_NOTES: &str = "(no supporting notes found)";

fn notes_or_placeholder(rendered_notes: &str) -> &str {
    if rendered_notes.is_empty() {
        NO_NOTES
    } else {
        rendered_notes
    }
}

/// Draft prompt: question + rendered notes
pub fn draft_prompt(question: &str, rendered_notes: &str) -> String {
    format!(
        "Question: {}\nUse these notes:\n{}\nAnswer briefly with refs [KBxxx].",
        question,
        notes_or_placeholder(rendered_notes)
    )
}

/// Review prompt. The reply must begin with `COMPLETE` or `REFINE:<keywords>`.
pub fn review_prompt(question: &str, rendered_notes: &str, answer: &str) -> String {
    format!(
        r#"Check this answer against the notes.
Question: {}
Notes:
{}
Answer: {}

Reply beginning with exactly one of:
- COMPLETE  (the answer is supported and sufficient)
- REFINE:<keywords>  (keywords to search for missing information)"#,
        question,
        notes_or_placeholder(rendered_notes),
        answer
    )
}

/// Refine prompt: every note gathered so far + question
pub fn refine_prompt(question: &str, rendered_notes: &str) -> String {
    format!(
        "Refine answer using all:\n{}\nQ: {}\nFinal answer with refs.",
        notes_or_placeholder(rendered_notes),
        question
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_prompt_contents() {
        let prompt = draft_prompt("How do I version my APIs?", "[KB1] A\n[KB2] B");
        assert!(prompt.starts_with("Question: How do I version my APIs?"));
        assert!(prompt.contains("[KB1] A\n[KB2] B"));
    }

    #[test]
    fn test_review_prompt_requires_directive() {
        let prompt = review_prompt("q", "[KB1] A", "draft-x");
        assert!(prompt.contains("Answer: draft-x"));
        assert!(prompt.contains("COMPLETE"));
        assert!(prompt.contains("REFINE:<keywords>"));
    }

    #[test]
    fn test_empty_notes_placeholder() {
        let prompt = refine_prompt("q", "");
        assert!(prompt.contains(NO_NOTES));
    }
}
