//! API handlers for the voxroom server.

use crate::AppState;
use axum::{
    extract::{Extension, Json, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Query parameters for `GET /getToken`.
#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    /// Participant identity; defaults when absent or empty.
    pub identity: Option<String>,
    /// Room to join; defaults when absent or empty.
    pub room: Option<String>,
}

/// Response body for a successfully issued token.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Handler for `GET /getToken`.
///
/// Signing failures are logged server-side and answered with a generic
/// message so nothing about the secret reaches the caller.
pub async fn get_token_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state
        .token_issuer
        .issue(query.identity.as_deref(), query.room.as_deref())
        .map_err(|e| {
            tracing::error!("failed to generate token: {}", e);
            ApiError::InternalServerError("Failed to generate token".to_string())
        })?;

    let claims = token.claims();
    tracing::info!(
        identity = %claims.sub,
        room = %claims.video.room,
        expires_at = claims.exp,
        "token generated"
    );

    Ok(Json(TokenResponse {
        token: token.into_jwt(),
    }))
}
