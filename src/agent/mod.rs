//! Answering loop - implements the self-critique state machine
//!
//! RETRIEVE → DRAFT → REVIEW → REFINE? → DONE

use crate::critique::CritiqueParser;
use crate::error::RagError;
use crate::knowledge::KnowledgeBase;
use crate::llm::LanguageModel;
use crate::models::{CritiqueVerdict, RagOutcome, Review, Snippet};
use crate::prompts;
use crate::snippets::SnippetStore;
use crate::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

pub const DEFAULT_INITIAL_K: usize = 5;
pub const DEFAULT_REFINE_K: usize = 1;
pub const DEFAULT_MAX_REFINE_ROUNDS: u32 = 1;

/// Retrieval sizes and the refine-round bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    initial_k: usize,
    refine_k: usize,
    max_refine_rounds: u32,
}

impl LoopConfig {
    pub fn new(initial_k: usize, refine_k: usize, max_refine_rounds: u32) -> Result<Self> {
        if initial_k == 0 || refine_k == 0 {
            return Err(RagError::Config(format!(
                "retrieval sizes must be at least 1 (initial_k={}, refine_k={})",
                initial_k, refine_k
            )));
        }

        Ok(Self {
            initial_k,
            refine_k,
            max_refine_rounds,
        })
    }

    pub fn initial_k(&self) -> usize {
        self.initial_k
    }

    pub fn refine_k(&self) -> usize {
        self.refine_k
    }

    pub fn max_refine_rounds(&self) -> u32 {
        self.max_refine_rounds
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            initial_k: DEFAULT_INITIAL_K,
            refine_k: DEFAULT_REFINE_K,
            max_refine_rounds: DEFAULT_MAX_REFINE_ROUNDS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStage {
    Retrieving,
    Drafting,
    Reviewing,
    Refining,
    Done,
}

/// Per-question accumulator, owned and mutated only by `RagLoop::step`
struct LoopState<'a> {
    question: String,
    store: SnippetStore<'a>,
    stage: LoopStage,
    draft: Option<String>,
    /// Latest refine-stage output, if any round ran
    refined: Option<String>,
    review: Option<Review>,
    final_answer: Option<String>,
    refine_rounds: u32,
    reasoning_trace: Vec<String>,
}

impl<'a> LoopState<'a> {
    fn new(question: &str, knowledge_base: &'a dyn KnowledgeBase) -> Self {
        Self {
            question: question.to_string(),
            store: SnippetStore::new(knowledge_base),
            stage: LoopStage::Retrieving,
            draft: None,
            refined: None,
            review: None,
            final_answer: None,
            refine_rounds: 0,
            reasoning_trace: Vec::new(),
        }
    }

    /// The answer the next review judges: the latest refinement, else the draft
    fn candidate(&self) -> Result<&str> {
        self.refined
            .as_deref()
            .or(self.draft.as_deref())
            .ok_or_else(|| RagError::InvalidState("review entered before drafting".to_string()))
    }

    fn finish_with(&mut self, answer: String) -> LoopStage {
        self.final_answer = Some(answer);
        LoopStage::Done
    }
}

/// Drives one question at a time through the answering loop
pub struct RagLoop {
    knowledge_base: Arc<dyn KnowledgeBase>,
    language_model: Arc<dyn LanguageModel>,
    config: LoopConfig,
}

impl RagLoop {
    pub fn new(
        knowledge_base: Arc<dyn KnowledgeBase>,
        language_model: Arc<dyn LanguageModel>,
        config: LoopConfig,
    ) -> Self {
        Self {
            knowledge_base,
            language_model,
            config,
        }
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Answer one question. Collaborator errors abort the run unchanged.
    pub async fn run(&self, question: &str) -> Result<RagOutcome> {
        let run_id = Uuid::new_v4();
        let span = info_span!("rag_run", %run_id);

        async {
            let start_time = Instant::now();

            info!(question = %question, "RagLoop: starting run");

            let mut state = LoopState::new(question, self.knowledge_base.as_ref());

            while state.stage != LoopStage::Done {
                let next = self.step(&mut state).await?;
                debug!(from = ?state.stage, to = ?next, "Stage transition");
                state.stage = next;
            }

            self.build_outcome(run_id, state, start_time)
        }
        .instrument(span)
        .await
    }

    async fn step(&self, state: &mut LoopState<'_>) -> Result<LoopStage> {
        match state.stage {
            // === RETRIEVE ===
            LoopStage::Retrieving => {
                let results = state
                    .store
                    .retrieve(&state.question, self.config.initial_k)
                    .await?;

                info!(snippet_count = results.len(), "Initial retrieval complete");
                state
                    .reasoning_trace
                    .push(format!("RETRIEVE: {} snippet(s)", results.len()));

                Ok(LoopStage::Drafting)
            }

            // === DRAFT ===
            LoopStage::Drafting => {
                let prompt = prompts::draft_prompt(&state.question, &state.store.render());
                let draft = self.language_model.complete(&prompt).await?;

                state
                    .reasoning_trace
                    .push(format!("DRAFT: {} chars", draft.len()));
                state.draft = Some(draft);

                Ok(LoopStage::Reviewing)
            }

            // === REVIEW ===
            LoopStage::Reviewing => {
                let prompt = prompts::review_prompt(
                    &state.question,
                    &state.store.render(),
                    state.candidate()?,
                );
                let raw_text = self.language_model.complete(&prompt).await?;
                let verdict = CritiqueParser::parse(&raw_text);

                info!(verdict = %verdict, "Review complete");
                state.reasoning_trace.push(format!("REVIEW: {}", verdict));

                let next = match &verdict {
                    CritiqueVerdict::Refine(_)
                        if state.refine_rounds < self.config.max_refine_rounds =>
                    {
                        LoopStage::Refining
                    }
                    _ => LoopStage::Done,
                };

                state.review = Some(Review { verdict, raw_text });

                if next == LoopStage::Done {
                    let answer = state.candidate()?.to_string();
                    state.reasoning_trace.push("DONE: answer accepted".to_string());
                    return Ok(state.finish_with(answer));
                }

                Ok(next)
            }

            // === REFINE ===
            LoopStage::Refining => {
                let query = state
                    .review
                    .as_ref()
                    .and_then(|r| r.verdict.follow_up_query())
                    .ok_or_else(|| {
                        RagError::InvalidState("refine entered without a REFINE verdict".to_string())
                    })?
                    .to_string();

                let added = state
                    .store
                    .supplement(&query, self.config.refine_k)
                    .await?;

                let prompt = prompts::refine_prompt(&state.question, &state.store.render());
                let refined = self.language_model.complete(&prompt).await?;

                state.refine_rounds += 1;
                info!(
                    round = state.refine_rounds,
                    query = %query,
                    added,
                    "Refine round complete"
                );
                state.reasoning_trace.push(format!(
                    "REFINE: round {} (+{} snippet(s) for \"{}\")",
                    state.refine_rounds, added, query
                ));

                if state.refine_rounds < self.config.max_refine_rounds {
                    state.refined = Some(refined);
                    return Ok(LoopStage::Reviewing);
                }

                state.reasoning_trace.push("DONE: refined answer".to_string());
                state.refined = Some(refined.clone());
                Ok(state.finish_with(refined))
            }

            LoopStage::Done => Ok(LoopStage::Done),
        }
    }

    fn build_outcome(
        &self,
        run_id: Uuid,
        state: LoopState<'_>,
        start_time: Instant,
    ) -> Result<RagOutcome> {
        let final_answer = state
            .final_answer
            .ok_or_else(|| RagError::InvalidState("loop ended without an answer".to_string()))?;
        let review = state
            .review
            .ok_or_else(|| RagError::InvalidState("loop ended without a review".to_string()))?;
        let draft = state.draft.unwrap_or_default();
        let snippets_used: Vec<Snippet> = state.store.into_snippets();

        info!(
            verdict = %review.verdict,
            refine_rounds = state.refine_rounds,
            snippet_count = snippets_used.len(),
            "RagLoop: run complete"
        );

        Ok(RagOutcome {
            run_id,
            question: state.question,
            final_answer,
            verdict: review.verdict,
            review_text: review.raw_text,
            draft,
            snippets_used,
            refine_rounds: state.refine_rounds,
            reasoning_trace: state.reasoning_trace,
            completed_at: Utc::now(),
            execution_time_ms: start_time.elapsed().as_millis() as u64,
        })
    }
}
