use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy for the assistant.
///
/// Pipeline-internal failures (`Retrieval`, `Synthesis`) are absorbed into the
/// web-search fallback and never reach the user as raw errors; the remaining
/// variants map onto HTTP responses for the serving surface.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("extraction failed: {0}")]
    Extraction(String),
    #[error("no readable content was extracted from the uploaded files")]
    EmptyInput,
    #[error("no text chunks could be generated from the documents")]
    EmptyIndex,
    #[error("language model not initialized: {0}")]
    ModelInit(String),
    #[error("retrieval failed: {0}")]
    Retrieval(String),
    #[error("synthesis failed: {0}")]
    Synthesis(String),
    #[error("web search unavailable: {0}")]
    SearchUnavailable(String),
    #[error("translation failed: {0}")]
    Translation(String),
    #[error("persistence failed: {0}")]
    Persistence(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ChatError::Internal(err.to_string())
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ChatError::Unauthorized => StatusCode::UNAUTHORIZED,
            ChatError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ChatError::NotFound(_) => StatusCode::NOT_FOUND,
            ChatError::EmptyInput | ChatError::EmptyIndex => StatusCode::UNPROCESSABLE_ENTITY,
            ChatError::ModelInit(_) | ChatError::SearchUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
