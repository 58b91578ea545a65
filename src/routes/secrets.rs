// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Secret routes. Values are opaque strings; every write adds a version.

use super::extract::{JsonBody, ValidatedJson, ValidatedQuery};
use super::ItemsResponse;
use crate::error::{AppError, Result};
use crate::models::secret::validate_secret_key;
use crate::models::{SecretCreate, SecretSummary, SecretUpdate, SecretValue};
use crate::services::{SecretError, SecretVersion};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct SecretListParams {
    pub prefix: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SecretUpdated {
    pub id: String,
    pub updated: bool,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/secrets", get(list_secrets).post(create_secret))
        .route(
            "/secrets/{key}",
            get(get_secret).put(update_secret).delete(delete_secret),
        )
}

/// Create a secret and store its first version.
///
/// Creating an existing key is not an error; the value becomes a new version.
async fn create_secret(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<SecretCreate>,
) -> Result<(StatusCode, Json<SecretSummary>)> {
    let labels = body.labels.unwrap_or_default();

    match state.secrets.create_secret(&body.key, &labels).await {
        Ok(()) => {}
        Err(SecretError::AlreadyExists(_)) => {
            tracing::debug!(key = %body.key, "Secret exists, adding version");
        }
        Err(e) => return Err(e.into()),
    }
    state.secrets.add_version(&body.key, &body.value).await?;

    Ok((
        StatusCode::CREATED,
        Json(SecretSummary {
            id: body.key,
            labels,
        }),
    ))
}

async fn list_secrets(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(params): ValidatedQuery<SecretListParams>,
) -> Result<Json<ItemsResponse<SecretSummary>>> {
    let items = state.secrets.list(params.prefix.as_deref()).await?;
    Ok(Json(ItemsResponse { items }))
}

async fn get_secret(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<SecretValue>> {
    check_key(&key)?;
    let value = state.secrets.access(&key, SecretVersion::Latest).await?;
    Ok(Json(SecretValue { id: key, value }))
}

async fn update_secret(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    JsonBody(body): JsonBody<SecretUpdate>,
) -> Result<Json<SecretUpdated>> {
    check_key(&key)?;
    state.secrets.add_version(&key, &body.value).await?;

    tracing::info!(key = %key, "Secret updated");
    Ok(Json(SecretUpdated {
        id: key,
        updated: true,
    }))
}

async fn delete_secret(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<StatusCode> {
    check_key(&key)?;
    state.secrets.delete(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn check_key(key: &str) -> Result<()> {
    validate_secret_key(key).map_err(|e| AppError::Validation(format!("key: {e}")))
}
