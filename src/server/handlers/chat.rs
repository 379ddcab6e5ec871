use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::core::errors::ChatError;
use crate::pipeline::{ChatOutcome, RequestContext};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    pub username: String,
    #[serde(default = "default_session")]
    pub session_id: String,
    #[serde(default = "default_language")]
    pub language: String,
    pub message: String,
}

fn default_session() -> String {
    "default_session".to_string()
}

fn default_language() -> String {
    "English".to_string()
}

/// Resolve one chat query. Requires a configured language model; the chat
/// flow stays blocked until credentials are fixed.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequestBody>,
) -> Result<Json<ChatOutcome>, ChatError> {
    if request.message.trim().is_empty() {
        return Err(ChatError::BadRequest("message cannot be empty".to_string()));
    }

    let pipeline = state.pipeline()?;
    let ctx = RequestContext {
        user: request.username,
        session_id: request.session_id,
        language: request.language,
    };

    let index = state.active_index().await;
    let outcome = pipeline.answer(&ctx, index, &request.message).await;
    Ok(Json(outcome))
}
