//! Query pipeline orchestration.
//!
//! One query runs reformulate → retrieve → synthesize → fallback decision →
//! (web search) → history append, strictly sequentially; each external call
//! is a single await point. Retrieval and synthesis failures are absorbed
//! into the fallback path, so the surfaced result is always a grounded
//! answer, a web-sourced answer, or an explicit no-answer message.

pub mod fallback;
pub mod reformulate;
pub mod synthesize;

use std::sync::Arc;

use serde::Serialize;

use crate::history::{HistoryStore, Role};
use crate::llm::LlmProvider;
use crate::rag::{Embedder, VectorIndex};
use crate::search::WebSearch;
use crate::translate::Translator;

use fallback::{
    should_fallback, web_fallback_answer, NO_ANSWER_MESSAGE, NO_ANSWER_SEARCH_UNAVAILABLE,
};
use synthesize::Synthesis;

/// Prefix attached to every grounded answer before it is surfaced.
pub const REMINDER_DISCLAIMER: &str =
    "⚠ *Gentle reminder: We generally ensure precise information, but do double-check.* \n\n";

/// Everything a single query needs to know about its caller. Passed
/// explicitly through the pipeline; there is no ambient session state.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: String,
    pub session_id: String,
    /// Response language display name ("English" disables translation).
    pub language: String,
}

/// Where the surfaced answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    Grounded,
    WebFallback,
    NoAnswer,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub answer: String,
    pub kind: AnswerKind,
    /// Deduplicated source labels of the chunks behind a grounded answer.
    pub sources: Vec<String>,
    /// Non-fatal problems (translation, persistence) worth surfacing.
    pub warnings: Vec<String>,
}

/// Per-query lifecycle. `Done` and `NoAnswer` are terminal; the next query
/// starts over from `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryPhase {
    Idle,
    Reformulating,
    Retrieving,
    Synthesizing,
    FallbackSearching,
    Done,
    NoAnswer,
}

pub struct ChatPipeline {
    llm: Arc<dyn LlmProvider>,
    embedder: Arc<dyn Embedder>,
    search: Arc<dyn WebSearch>,
    translator: Arc<dyn Translator>,
    history: Arc<HistoryStore>,
    retrieval_top_k: usize,
    search_result_count: usize,
}

impl ChatPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        embedder: Arc<dyn Embedder>,
        search: Arc<dyn WebSearch>,
        translator: Arc<dyn Translator>,
        history: Arc<HistoryStore>,
        retrieval_top_k: usize,
        search_result_count: usize,
    ) -> Self {
        Self {
            llm,
            embedder,
            search,
            translator,
            history,
            retrieval_top_k: retrieval_top_k.max(1),
            search_result_count: search_result_count.max(1),
        }
    }

    /// Resolve one user query end to end.
    ///
    /// `index` is the active knowledge base, if any; the caller snapshots the
    /// `Arc` so a concurrent rebuild cannot pull it out from under the query.
    pub async fn answer(
        &self,
        ctx: &RequestContext,
        index: Option<Arc<VectorIndex>>,
        question: &str,
    ) -> ChatOutcome {
        let mut warnings = Vec::new();
        self.trace_phase(ctx, QueryPhase::Idle);

        let history = self.history.get_or_create(&ctx.user, &ctx.session_id).await;

        let grounded = match index {
            Some(index) => self.try_grounded(ctx, &index, &history, question).await,
            None => None,
        };

        if let Some(synthesis) = grounded {
            let mut body = synthesis.answer;
            if self.wants_translation(ctx) {
                match self.translator.translate(&body, &ctx.language).await {
                    Ok(translated) => body = translated,
                    Err(e) => {
                        tracing::warn!("translation failed: {}", e);
                        warnings.push(format!(
                            "Failed to translate to {}: {}. Displaying in English.",
                            ctx.language, e
                        ));
                    }
                }
            }
            let surfaced = format!("{}{}", REMINDER_DISCLAIMER, body);

            let mut sources: Vec<String> = synthesis
                .used_chunks
                .iter()
                .map(|c| c.source_label.clone())
                .collect();
            sources.sort();
            sources.dedup();

            self.record_turn(ctx, question, &surfaced, &mut warnings).await;
            self.trace_phase(ctx, QueryPhase::Done);
            return ChatOutcome {
                answer: surfaced,
                kind: AnswerKind::Grounded,
                sources,
                warnings,
            };
        }

        self.trace_phase(ctx, QueryPhase::FallbackSearching);
        let (answer, kind, terminal) =
            match self.search.search(question, self.search_result_count).await {
                Ok(results) => match results.into_iter().next() {
                    Some(top) => {
                        let mut answer = web_fallback_answer(&top);
                        if self.wants_translation(ctx) {
                            match self.translator.translate(&answer, &ctx.language).await {
                                Ok(translated) => answer = translated,
                                Err(e) => {
                                    tracing::warn!("translation failed: {}", e);
                                    warnings.push(format!(
                                        "Failed to translate to {}: {}. Displaying in English.",
                                        ctx.language, e
                                    ));
                                }
                            }
                        }
                        (answer, AnswerKind::WebFallback, QueryPhase::Done)
                    }
                    None => (
                        NO_ANSWER_MESSAGE.to_string(),
                        AnswerKind::NoAnswer,
                        QueryPhase::NoAnswer,
                    ),
                },
                Err(e) => {
                    tracing::warn!("web search unavailable: {}", e);
                    (
                        NO_ANSWER_SEARCH_UNAVAILABLE.to_string(),
                        AnswerKind::NoAnswer,
                        QueryPhase::NoAnswer,
                    )
                }
            };

        self.record_turn(ctx, question, &answer, &mut warnings).await;
        self.trace_phase(ctx, terminal);
        ChatOutcome {
            answer,
            kind,
            sources: Vec::new(),
            warnings,
        }
    }

    /// The grounded attempt: reformulate, retrieve, synthesize. Any failure
    /// or a refusal-flavored answer yields `None`, routing to the fallback.
    async fn try_grounded(
        &self,
        ctx: &RequestContext,
        index: &VectorIndex,
        history: &[crate::history::Message],
        question: &str,
    ) -> Option<Synthesis> {
        self.trace_phase(ctx, QueryPhase::Reformulating);
        let standalone = match reformulate::reformulate(&self.llm, history, question).await {
            Ok(q) => q,
            Err(e) => {
                tracing::warn!("reformulation failed, falling back to web search: {}", e);
                return None;
            }
        };

        self.trace_phase(ctx, QueryPhase::Retrieving);
        let retrieved = match index
            .query(self.embedder.as_ref(), &standalone, self.retrieval_top_k)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("retrieval failed, falling back to web search: {}", e);
                return None;
            }
        };

        self.trace_phase(ctx, QueryPhase::Synthesizing);
        match synthesize::synthesize(&self.llm, &standalone, &retrieved, history).await {
            Ok(synthesis) if !should_fallback(&synthesis.answer) => Some(synthesis),
            Ok(synthesis) => {
                tracing::debug!(
                    "synthesized answer flagged as unsupported ({} chars)",
                    synthesis.answer.trim().len()
                );
                None
            }
            Err(e) => {
                tracing::warn!("synthesis failed, falling back to web search: {}", e);
                None
            }
        }
    }

    fn wants_translation(&self, ctx: &RequestContext) -> bool {
        !ctx.language.trim().is_empty() && !ctx.language.trim().eq_ignore_ascii_case("english")
    }

    /// Append the turn and flush the durable record. A persistence failure is
    /// a warning; the in-memory history stays usable for the session.
    async fn record_turn(
        &self,
        ctx: &RequestContext,
        question: &str,
        answer: &str,
        warnings: &mut Vec<String>,
    ) {
        self.history
            .append(&ctx.user, &ctx.session_id, Role::Human, question)
            .await;
        self.history
            .append(&ctx.user, &ctx.session_id, Role::Ai, answer)
            .await;

        if let Err(e) = self.history.persist(&ctx.user, &ctx.session_id).await {
            tracing::warn!("Error saving chat history: {}", e);
            warnings.push(format!("Error saving chat history: {}", e));
        }
    }

    fn trace_phase(&self, ctx: &RequestContext, phase: QueryPhase) {
        tracing::debug!(
            user = %ctx.user,
            session = %ctx.session_id,
            phase = ?phase,
            "query phase"
        );
    }
}

