use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::core::errors::ChatError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub username: String,
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<SignupResponse>, ChatError> {
    state.users.add_user(&request.username, &request.password)?;
    Ok(Json(SignupResponse {
        message: "Account created successfully. You can now log in.".to_string(),
    }))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>, ChatError> {
    if !state.users.verify_user(&request.username, &request.password) {
        return Err(ChatError::Unauthorized);
    }
    Ok(Json(LoginResponse {
        username: request.username,
    }))
}
