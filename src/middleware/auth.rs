// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer token authentication middleware.
//!
//! When `REQUIRE_AUTH` is off every request passes through without an
//! identity. When on, the token's algorithm picks the verifier: HS256 tokens
//! are development tokens, RS256 tokens are Firebase ID tokens. HS256 tokens
//! are refused outright unless `DEV_TOKENS_ENABLED` is set.

use crate::error::AppError;
use crate::services::FirebaseAuthError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode_header, Algorithm};
use std::sync::Arc;

/// Authenticated caller, attached to the request when auth is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub uid: String,
    pub email: Option<String>,
}

/// Middleware that requires a valid bearer token when auth is enabled.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.config.require_auth {
        return Ok(next.run(request).await);
    }

    let token = bearer_token(request.headers()).ok_or(AppError::Unauthorized)?;
    let caller = authenticate(&state, token).await?;

    tracing::debug!(uid = %caller.uid, "Authenticated request");
    request.extensions_mut().insert(caller);

    Ok(next.run(request).await)
}

/// Token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Verify a bearer token with the verifier matching its algorithm.
pub async fn authenticate(state: &AppState, token: &str) -> Result<Caller, AppError> {
    let header = decode_header(token).map_err(|_| AppError::InvalidToken)?;

    match header.alg {
        Algorithm::HS256 if !state.config.dev_tokens_enabled => {
            tracing::debug!("Development token presented while dev tokens are disabled");
            Err(AppError::InvalidToken)
        }
        Algorithm::HS256 => {
            let claims = state.dev_tokens.verify(token).map_err(|e| {
                tracing::debug!(error = %e, "Development token rejected");
                AppError::InvalidToken
            })?;
            Ok(Caller {
                uid: claims.sub,
                email: claims.email,
            })
        }
        Algorithm::RS256 => {
            let verifier = state.firebase.as_ref().ok_or(AppError::InvalidToken)?;
            match verifier.verify(token).await {
                Ok(identity) => Ok(Caller {
                    uid: identity.uid,
                    email: identity.email,
                }),
                Err(FirebaseAuthError::Rejected(reason)) => {
                    tracing::debug!(reason = %reason, "Firebase ID token rejected");
                    Err(AppError::InvalidToken)
                }
                Err(FirebaseAuthError::Unavailable(reason)) => {
                    Err(AppError::UpstreamTransient(reason))
                }
            }
        }
        other => {
            tracing::debug!(alg = ?other, "Unsupported token algorithm");
            Err(AppError::InvalidToken)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn bearer_token_extraction() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers_with("Basic abc")), None);
        assert_eq!(bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
