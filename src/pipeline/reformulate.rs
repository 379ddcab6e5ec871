//! History-aware query reformulation.

use std::sync::Arc;

use crate::core::errors::ChatError;
use crate::history::{Message, Role};
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};

const CONTEXTUALIZE_PROMPT: &str = "Given a chat history and the latest user question which \
     might reference context in the chat history, formulate a standalone question which can be \
     understood without the chat history. Do NOT answer the question, just reformulate it if \
     needed and otherwise return it as is.";

/// Rewrite a follow-up question into a standalone query.
///
/// With no prior turns there is nothing to resolve, so the question passes
/// through untouched without a model call. Output is a single question
/// string, never dialogue.
pub async fn reformulate(
    llm: &Arc<dyn LlmProvider>,
    history: &[Message],
    question: &str,
) -> Result<String, ChatError> {
    if history.is_empty() {
        return Ok(question.to_string());
    }

    let mut messages = vec![ChatMessage::system(CONTEXTUALIZE_PROMPT)];
    messages.extend(history.iter().map(to_chat_message));
    messages.push(ChatMessage::user(question));

    let standalone = llm
        .chat(ChatRequest::new(messages))
        .await
        .map_err(|e| ChatError::Retrieval(e.to_string()))?;

    let standalone = standalone.trim();
    if standalone.is_empty() {
        return Ok(question.to_string());
    }
    Ok(standalone.to_string())
}

pub(crate) fn to_chat_message(message: &Message) -> ChatMessage {
    match message.role {
        Role::Human => ChatMessage::user(message.content.clone()),
        Role::Ai => ChatMessage::assistant(message.content.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Provider that fails the test if the model is ever invoked.
    struct PanicsIfCalled;

    #[async_trait]
    impl LlmProvider for PanicsIfCalled {
        fn name(&self) -> &str {
            "panics"
        }
        async fn health_check(&self) -> Result<bool, ChatError> {
            Ok(true)
        }
        async fn chat(&self, _request: ChatRequest) -> Result<String, ChatError> {
            panic!("reformulation must not call the model with empty history");
        }
    }

    struct FixedReply(String);

    #[async_trait]
    impl LlmProvider for FixedReply {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn health_check(&self) -> Result<bool, ChatError> {
            Ok(true)
        }
        async fn chat(&self, _request: ChatRequest) -> Result<String, ChatError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn empty_history_is_a_deterministic_passthrough() {
        let llm: Arc<dyn LlmProvider> = Arc::new(PanicsIfCalled);
        let out = reformulate(&llm, &[], "What is the notice period?")
            .await
            .unwrap();
        assert_eq!(out, "What is the notice period?");
    }

    #[tokio::test]
    async fn non_empty_history_uses_the_model() {
        let llm: Arc<dyn LlmProvider> =
            Arc::new(FixedReply("What is the contract's notice period?".to_string()));
        let history = vec![
            Message::human("Tell me about the contract."),
            Message::ai("It covers termination and payment."),
        ];
        let out = reformulate(&llm, &history, "What about the notice period?")
            .await
            .unwrap();
        assert_eq!(out, "What is the contract's notice period?");
    }

    #[tokio::test]
    async fn blank_model_output_falls_back_to_the_question() {
        let llm: Arc<dyn LlmProvider> = Arc::new(FixedReply("  ".to_string()));
        let history = vec![Message::human("hi")];
        let out = reformulate(&llm, &history, "And the notice period?")
            .await
            .unwrap();
        assert_eq!(out, "And the notice period?");
    }
}
