// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod auth;
pub mod extract;
pub mod prompts;
pub mod records;
pub mod secrets;

use crate::middleware::{require_auth, security::add_security_headers};
use crate::models::{Flag, HistoryEntry, RecognizedObject, User};
use crate::AppState;
use axum::http::{header, request::Parts, HeaderValue, Method};
use axum::{middleware, routing::get, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Prefix for every API resource.
pub const API_PREFIX: &str = "/api/v1";

/// List response envelope.
#[derive(Debug, Serialize)]
pub struct ItemsResponse<T> {
    pub items: Vec<T>,
}

/// Liveness probe.
async fn healthz() -> &'static str {
    "ok"
}

/// CORS for the configured frontend plus local development origins.
fn cors_layer(frontend_url: String) -> CorsLayer {
    let allowed = AllowOrigin::predicate(move |origin: &HeaderValue, _: &Parts| {
        origin.to_str().is_ok_and(|origin| {
            origin == frontend_url
                || ["http://localhost", "http://127.0.0.1"]
                    .iter()
                    .any(|local| origin.starts_with(local))
        })
    });

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // Resource routes (auth required when enabled)
    let protected_routes = Router::new()
        .merge(records::routes::<User>("/users"))
        .merge(records::routes::<HistoryEntry>("/history"))
        .merge(records::routes::<RecognizedObject>("/objects"))
        .merge(records::routes::<Flag>("/flags"))
        .merge(prompts::routes())
        .merge(secrets::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Token routes stay public so callers can obtain a token
    let api_routes = protected_routes.merge(auth::routes());

    Router::new()
        .route("/healthz", get(healthz))
        .nest(API_PREFIX, api_routes)
        .layer(middleware::from_fn(add_security_headers))
        .layer(cors_layer(state.config.frontend_url.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
