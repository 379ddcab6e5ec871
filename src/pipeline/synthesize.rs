//! Grounded answer synthesis.
//!
//! The prompt constrains the model to the retrieved chunks and instructs it
//! to emit the refusal phrase when they are insufficient; that phrase is the
//! contract the fallback detector keys on.

use std::sync::Arc;

use super::fallback::REFUSAL_PHRASE;
use crate::core::errors::ChatError;
use crate::history::Message;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::rag::{DocumentChunk, ScoredChunk};

pub struct Synthesis {
    pub answer: String,
    pub used_chunks: Vec<DocumentChunk>,
}

fn grounded_system_prompt(context: &str) -> String {
    format!(
        "You are a knowledge-based AI assistant specializing in providing comprehensive and \
         accurate answers based solely on the provided context. Follow these guidelines:\n\n\
         1. Strictly adhere to the provided context: Do not use any outside knowledge. If the \
         answer isn't in the context, state \"{}\"\n\
         2. Provide detailed and exhaustive answers: When the context permits, elaborate on the \
         topic, explaining concepts thoroughly and providing relevant specifics.\n\
         3. Structure your responses clearly: Use headings, bullet points, or numbered lists \
         when appropriate to make the information easy to read and understand.\n\
         4. Maintain accuracy and logical coherence: Ensure all parts of your answer are \
         factually correct according to the context and flow logically.\n\
         5. Prioritize answering the user's direct question: While being detailed, ensure the \
         core of your response directly addresses the user's query.\n\n\
         Context:\n{}",
        REFUSAL_PHRASE, context
    )
}

/// Answer `query` strictly from `retrieved`, with the conversation so far as
/// additional context for phrasing.
pub async fn synthesize(
    llm: &Arc<dyn LlmProvider>,
    query: &str,
    retrieved: &[ScoredChunk],
    history: &[Message],
) -> Result<Synthesis, ChatError> {
    let context = retrieved
        .iter()
        .map(|s| s.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut messages = vec![ChatMessage::system(grounded_system_prompt(&context))];
    messages.extend(history.iter().map(super::reformulate::to_chat_message));
    messages.push(ChatMessage::user(query));

    let answer = llm
        .chat(ChatRequest::new(messages))
        .await
        .map_err(|e| ChatError::Synthesis(e.to_string()))?;

    Ok(Synthesis {
        answer,
        used_chunks: retrieved.iter().map(|s| s.chunk.clone()).collect(),
    })
}
