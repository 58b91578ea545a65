// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Development token routes.
//!
//! `POST /auth/token` hands out HS256 tokens for any user id. It exists so
//! clients can be built before real sign-in is wired up, and answers 404
//! unless `DEV_TOKENS_ENABLED` is set.

use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::services::tokens::DEV_TOKEN_TTL_SECS;
use crate::AppState;

const DEFAULT_DEV_USER_ID: &str = "test-user-123";
const DEFAULT_DEV_EMAIL: &str = "test@trailogo.com";
const TOKEN_ISSUER: &str = "hs256-dev";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/token", post(issue_token))
        .route("/auth/health", get(auth_health))
}

/// Body of `POST /auth/token`. Both fields are optional; a null email
/// falls back to the default one.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Default for TokenRequest {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            email: None,
        }
    }
}

fn default_user_id() -> String {
    DEFAULT_DEV_USER_ID.to_string()
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_in: u64,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct AuthHealth {
    pub status: &'static str,
    pub token_issuer: &'static str,
    pub can_generate_tokens: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Mint a development token. An empty body uses the default test user.
async fn issue_token(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<TokenResponse>> {
    if !state.config.dev_tokens_enabled {
        return Err(AppError::NotFound("development tokens are disabled".to_string()));
    }

    let request: TokenRequest = if body.iter().all(u8::is_ascii_whitespace) {
        TokenRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::Validation(e.to_string()))?
    };

    let email = request.email.as_deref().unwrap_or(DEFAULT_DEV_EMAIL);
    let token = state.dev_tokens.mint(&request.user_id, Some(email))?;

    tracing::info!(user_id = %request.user_id, "Issued development token");

    Ok(Json(TokenResponse {
        token,
        expires_in: DEV_TOKEN_TTL_SECS,
        user_id: request.user_id,
    }))
}

/// Report whether tokens can be minted. Always answers 200.
async fn auth_health(State(state): State<Arc<AppState>>) -> Json<AuthHealth> {
    if !state.config.dev_tokens_enabled {
        return Json(AuthHealth {
            status: "disabled",
            token_issuer: TOKEN_ISSUER,
            can_generate_tokens: false,
            error: None,
        });
    }

    let self_check = state
        .dev_tokens
        .mint(DEFAULT_DEV_USER_ID, None)
        .and_then(|token| Ok(state.dev_tokens.verify(&token)?));

    match self_check {
        Ok(_) => Json(AuthHealth {
            status: "healthy",
            token_issuer: TOKEN_ISSUER,
            can_generate_tokens: true,
            error: None,
        }),
        Err(e) => {
            tracing::error!(error = %e, "Token self-check failed");
            Json(AuthHealth {
                status: "unhealthy",
                token_issuer: TOKEN_ISSUER,
                can_generate_tokens: false,
                error: Some(e.to_string()),
            })
        }
    }
}
