//! End-to-end pipeline tests with in-process doubles at the external seams
//! (language model, web search, translation).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use legalease_backend::core::errors::ChatError;
use legalease_backend::history::{HistoryStore, Role};
use legalease_backend::llm::{ChatRequest, LlmProvider};
use legalease_backend::pipeline::fallback::{
    NO_ANSWER_MESSAGE, NO_ANSWER_SEARCH_UNAVAILABLE, REFUSAL_PHRASE,
};
use legalease_backend::pipeline::{AnswerKind, ChatPipeline, RequestContext, REMINDER_DISCLAIMER};
use legalease_backend::rag::embedder::HashingEmbedder;
use legalease_backend::rag::{build_knowledge_base, ChunkerConfig, Embedder, UploadedFile};
use legalease_backend::search::{SearchResult, WebSearch};
use legalease_backend::translate::Translator;

/// Replays canned completions in order; fails the test when exhausted.
struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedLlm {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
        })
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }
    async fn health_check(&self) -> Result<bool, ChatError> {
        Ok(true)
    }
    async fn chat(&self, _request: ChatRequest) -> Result<String, ChatError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ChatError::Internal("scripted llm exhausted".to_string()))
    }
}

struct PanickingLlm;

#[async_trait]
impl LlmProvider for PanickingLlm {
    fn name(&self) -> &str {
        "panicking"
    }
    async fn health_check(&self) -> Result<bool, ChatError> {
        Ok(true)
    }
    async fn chat(&self, _request: ChatRequest) -> Result<String, ChatError> {
        panic!("the language model must not be called on this path");
    }
}

struct FixedSearch(Vec<SearchResult>);

#[async_trait]
impl WebSearch for FixedSearch {
    async fn search(
        &self,
        _query: &str,
        _result_count: usize,
    ) -> Result<Vec<SearchResult>, ChatError> {
        Ok(self.0.clone())
    }
}

struct UnavailableSearch;

#[async_trait]
impl WebSearch for UnavailableSearch {
    async fn search(
        &self,
        _query: &str,
        _result_count: usize,
    ) -> Result<Vec<SearchResult>, ChatError> {
        Err(ChatError::SearchUnavailable("connection refused".to_string()))
    }
}

struct PanickingSearch;

#[async_trait]
impl WebSearch for PanickingSearch {
    async fn search(
        &self,
        _query: &str,
        _result_count: usize,
    ) -> Result<Vec<SearchResult>, ChatError> {
        panic!("web search must not be invoked for a grounded answer");
    }
}

struct PanickingTranslator;

#[async_trait]
impl Translator for PanickingTranslator {
    async fn translate(&self, _text: &str, _target: &str) -> Result<String, ChatError> {
        panic!("translation must not run for English responses");
    }
}

struct FailingTranslator;

#[async_trait]
impl Translator for FailingTranslator {
    async fn translate(&self, _text: &str, _target: &str) -> Result<String, ChatError> {
        Err(ChatError::Translation("endpoint down".to_string()))
    }
}

fn ctx(language: &str) -> RequestContext {
    RequestContext {
        user: "alice".to_string(),
        session_id: "s1".to_string(),
        language: language.to_string(),
    }
}

fn pipeline(
    llm: Arc<dyn LlmProvider>,
    search: Arc<dyn WebSearch>,
    translator: Arc<dyn Translator>,
    history: Arc<HistoryStore>,
) -> ChatPipeline {
    ChatPipeline::new(
        llm,
        Arc::new(HashingEmbedder::new()),
        search,
        translator,
        history,
        4,
        3,
    )
}

async fn contract_index(embedder: &dyn Embedder) -> legalease_backend::rag::VectorIndex {
    let outcome = build_knowledge_base(
        embedder,
        &ChunkerConfig::default(),
        &[UploadedFile {
            name: "contract.txt".to_string(),
            bytes: b"The termination clause requires 30 days notice.".to_vec(),
        }],
    )
    .await
    .unwrap();
    outcome.index
}

#[tokio::test]
async fn grounded_answer_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let history = Arc::new(HistoryStore::new(dir.path()));
    let embedder = HashingEmbedder::new();
    let index = Arc::new(contract_index(&embedder).await);

    // empty history: reformulation is a passthrough, so the only model call
    // is the synthesis one
    let llm = ScriptedLlm::new(&["The termination clause requires 30 days notice."]);
    let pipe = pipeline(
        llm,
        Arc::new(PanickingSearch),
        Arc::new(PanickingTranslator),
        history.clone(),
    );

    let outcome = pipe
        .answer(
            &ctx("English"),
            Some(index),
            "How much notice is required for termination?",
        )
        .await;

    assert_eq!(outcome.kind, AnswerKind::Grounded);
    assert!(outcome.answer.contains("30 days"));
    assert!(outcome.answer.starts_with(REMINDER_DISCLAIMER));
    assert_eq!(outcome.sources, vec!["contract.txt".to_string()]);
    assert!(outcome.warnings.is_empty());

    // the turn was appended and persisted
    let reloaded = HistoryStore::new(dir.path());
    let messages = reloaded.get_or_create("alice", "s1").await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::Human);
    assert_eq!(
        messages[0].content,
        "How much notice is required for termination?"
    );
    assert_eq!(messages[1].role, Role::Ai);
    assert!(messages[1].content.contains("30 days"));
}

#[tokio::test]
async fn no_documents_and_no_results_persists_the_terminal_message() {
    let dir = tempfile::tempdir().unwrap();
    let history = Arc::new(HistoryStore::new(dir.path()));

    // no index: the model is never consulted, search returns nothing
    let pipe = pipeline(
        Arc::new(PanickingLlm),
        Arc::new(FixedSearch(Vec::new())),
        Arc::new(PanickingTranslator),
        history.clone(),
    );

    let outcome = pipe
        .answer(&ctx("English"), None, "What is the meaning of clause 9?")
        .await;

    assert_eq!(outcome.kind, AnswerKind::NoAnswer);
    assert_eq!(outcome.answer, NO_ANSWER_MESSAGE);
    assert!(outcome.sources.is_empty());

    let reloaded = HistoryStore::new(dir.path());
    let messages = reloaded.get_or_create("alice", "s1").await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, NO_ANSWER_MESSAGE);
}

#[tokio::test]
async fn refusal_answer_falls_back_to_the_top_web_result() {
    let dir = tempfile::tempdir().unwrap();
    let history = Arc::new(HistoryStore::new(dir.path()));
    let embedder = HashingEmbedder::new();
    let index = Arc::new(contract_index(&embedder).await);

    let llm = ScriptedLlm::new(&[REFUSAL_PHRASE]);
    let search = FixedSearch(vec![
        SearchResult {
            title: "Res judicata".to_string(),
            url: "https://example.org/res-judicata".to_string(),
            snippet: "A matter already judged.".to_string(),
        },
        SearchResult {
            title: "Second result".to_string(),
            url: "https://example.org/second".to_string(),
            snippet: "Ignored.".to_string(),
        },
    ]);

    let pipe = pipeline(
        llm,
        Arc::new(search),
        Arc::new(PanickingTranslator),
        history.clone(),
    );

    let outcome = pipe
        .answer(&ctx("English"), Some(index), "What is res judicata?")
        .await;

    assert_eq!(outcome.kind, AnswerKind::WebFallback);
    assert!(outcome.answer.contains("Res judicata"));
    assert!(outcome.answer.contains("A matter already judged."));
    assert!(outcome.answer.contains("https://example.org/res-judicata"));
    // only the top result is used
    assert!(!outcome.answer.contains("Second result"));
}

#[tokio::test]
async fn unavailable_search_degrades_to_the_terminal_message() {
    let dir = tempfile::tempdir().unwrap();
    let history = Arc::new(HistoryStore::new(dir.path()));

    let pipe = pipeline(
        Arc::new(PanickingLlm),
        Arc::new(UnavailableSearch),
        Arc::new(PanickingTranslator),
        history.clone(),
    );

    let outcome = pipe.answer(&ctx("English"), None, "Anything at all?").await;

    assert_eq!(outcome.kind, AnswerKind::NoAnswer);
    assert_eq!(outcome.answer, NO_ANSWER_SEARCH_UNAVAILABLE);
}

#[tokio::test]
async fn synthesis_failure_is_absorbed_into_the_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let history = Arc::new(HistoryStore::new(dir.path()));
    let embedder = HashingEmbedder::new();
    let index = Arc::new(contract_index(&embedder).await);

    // scripted llm is empty: the synthesis call errors out
    let llm = ScriptedLlm::new(&[]);
    let pipe = pipeline(
        llm,
        Arc::new(FixedSearch(Vec::new())),
        Arc::new(PanickingTranslator),
        history.clone(),
    );

    let outcome = pipe
        .answer(&ctx("English"), Some(index), "How much notice is required?")
        .await;

    // no raw error surfaces; the terminal message does
    assert_eq!(outcome.kind, AnswerKind::NoAnswer);
    assert_eq!(outcome.answer, NO_ANSWER_MESSAGE);
}

#[tokio::test]
async fn failed_translation_warns_and_keeps_english() {
    let dir = tempfile::tempdir().unwrap();
    let history = Arc::new(HistoryStore::new(dir.path()));
    let embedder = HashingEmbedder::new();
    let index = Arc::new(contract_index(&embedder).await);

    let llm = ScriptedLlm::new(&["The termination clause requires 30 days notice."]);
    let pipe = pipeline(
        llm,
        Arc::new(PanickingSearch),
        Arc::new(FailingTranslator),
        history.clone(),
    );

    let outcome = pipe
        .answer(
            &ctx("Spanish"),
            Some(index),
            "How much notice is required for termination?",
        )
        .await;

    assert_eq!(outcome.kind, AnswerKind::Grounded);
    assert!(outcome.answer.contains("30 days"));
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("Spanish"));
}

#[tokio::test]
async fn follow_up_question_is_reformulated_against_history() {
    let dir = tempfile::tempdir().unwrap();
    let history = Arc::new(HistoryStore::new(dir.path()));
    let embedder = HashingEmbedder::new();
    let index = Arc::new(contract_index(&embedder).await);

    history
        .append("alice", "s1", Role::Human, "Tell me about the termination clause.")
        .await;
    history
        .append("alice", "s1", Role::Ai, "It requires notice before ending the contract.")
        .await;

    // first reply reformulates, second synthesizes
    let llm = ScriptedLlm::new(&[
        "How much notice does the termination clause require?",
        "The termination clause requires 30 days notice.",
    ]);
    let pipe = pipeline(
        llm,
        Arc::new(PanickingSearch),
        Arc::new(PanickingTranslator),
        history.clone(),
    );

    let outcome = pipe
        .answer(&ctx("English"), Some(index), "How much notice?")
        .await;

    assert_eq!(outcome.kind, AnswerKind::Grounded);
    assert!(outcome.answer.contains("30 days"));

    // history now holds the two prior turns plus this one
    let messages = history.get_or_create("alice", "s1").await;
    assert_eq!(messages.len(), 4);
}
