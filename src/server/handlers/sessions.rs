use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::core::errors::ChatError;
use crate::history::Message;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<Message>,
}

pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path((user, session_id)): Path<(String, String)>,
) -> Result<Json<HistoryResponse>, ChatError> {
    let messages = state.history.get_or_create(&user, &session_id).await;
    Ok(Json(HistoryResponse { messages }))
}

pub async fn clear_history(
    State(state): State<Arc<AppState>>,
    Path((user, session_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ChatError> {
    state.history.clear(&user, &session_id).await?;
    Ok(Json(serde_json::json!({
        "message": format!("Chat history for session '{}' cleared.", session_id)
    })))
}
