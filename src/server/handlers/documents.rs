use std::sync::Arc;

use axum::{extract::State, Json};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::core::errors::ChatError;
use crate::rag::{build_knowledge_base, ChunkerConfig, UploadedFile};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub files: Vec<FilePayload>,
}

#[derive(Debug, Deserialize)]
pub struct FilePayload {
    pub name: String,
    /// base64-encoded file bytes
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub doc_names: Vec<String>,
    pub chunk_count: usize,
    pub warnings: Vec<String>,
}

/// Process an uploaded batch and swap in the new knowledge base.
pub async fn process_documents(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, ChatError> {
    if request.files.is_empty() {
        return Err(ChatError::BadRequest("no files provided".to_string()));
    }

    let mut files = Vec::with_capacity(request.files.len());
    for payload in request.files {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.content.as_bytes())
            .map_err(|e| ChatError::BadRequest(format!("invalid base64 for {}: {}", payload.name, e)))?;
        files.push(UploadedFile {
            name: payload.name,
            bytes,
        });
    }

    let config = ChunkerConfig {
        chunk_size: state.settings.rag.chunk_size,
        chunk_overlap: state.settings.rag.chunk_overlap,
    };

    let outcome = build_knowledge_base(state.embedder.as_ref(), &config, &files).await?;

    let response = UploadResponse {
        doc_names: outcome.doc_names.clone(),
        chunk_count: outcome.chunk_count,
        warnings: outcome.warnings.clone(),
    };
    state.replace_index(outcome.index).await;

    Ok(Json(response))
}
