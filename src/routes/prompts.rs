// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Prompt routes: generate a completion, then log it.

use super::extract::{JsonBody, ValidatedJson, ValidatedQuery};
use super::ItemsResponse;
use crate::db::{collections, Document, Fields, ListQuery};
use crate::error::{AppError, Result};
use crate::models::{PromptIn, PromptLog, PromptUpdate};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use validator::Validate;

const DEFAULT_PROMPT_LIMIT: u32 = 10;

#[derive(Debug, Deserialize, Validate)]
pub struct PromptListParams {
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/prompts", get(list_prompts).post(create_prompt))
        .route(
            "/prompts/{id}",
            get(get_prompt).put(update_prompt).delete(delete_prompt),
        )
}

/// Run the prompt through the generator and store the result.
///
/// Nothing is stored when generation fails.
async fn create_prompt(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<PromptIn>,
) -> Result<(StatusCode, Json<Document>)> {
    let model = body
        .model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| state.generator.default_model().to_string());

    let output = state
        .generator
        .generate(&model, &body.prompt)
        .await
        .inspect_err(|e| tracing::warn!(model = %model, error = %e, "Generation failed"))?;

    let log = PromptLog {
        prompt: body.prompt,
        model,
        output,
        ts: now_rfc3339(),
    };
    let fields = match serde_json::to_value(&log) {
        Ok(Value::Object(fields)) => fields,
        _ => return Err(AppError::Internal(anyhow::anyhow!("prompt log is not an object"))),
    };

    let doc = state.db.create(collections::PROMPTS, fields).await?;

    tracing::info!(id = %doc.id, model = %log.model, "Prompt logged");
    Ok((StatusCode::CREATED, Json(doc)))
}

async fn list_prompts(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(params): ValidatedQuery<PromptListParams>,
) -> Result<Json<ItemsResponse<Document>>> {
    let query = ListQuery {
        filters: Vec::new(),
        limit: params.limit.unwrap_or(DEFAULT_PROMPT_LIMIT),
        newest_first_by: Some("ts"),
    };
    let items = state.db.list(collections::PROMPTS, &query).await?;
    Ok(Json(ItemsResponse { items }))
}

async fn get_prompt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Document>> {
    state
        .db
        .get(collections::PROMPTS, &id)
        .await?
        .map(Json)
        .ok_or_else(|| prompt_not_found(&id))
}

/// Set the prompt's note. A missing or null note leaves the log unchanged.
async fn update_prompt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<PromptUpdate>,
) -> Result<Json<Document>> {
    let mut patch = Fields::new();
    if let Some(note) = body.note {
        patch.insert("note".to_string(), Value::String(note));
    }

    state
        .db
        .merge(collections::PROMPTS, &id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| prompt_not_found(&id))
}

async fn delete_prompt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.db.delete(collections::PROMPTS, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn prompt_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("prompt {id} not found"))
}
