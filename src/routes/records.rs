// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! CRUD routes shared by the users, history, objects and flags collections.

use super::extract::{JsonBody, ValidatedJson, ValidatedQuery};
use super::ItemsResponse;
use crate::db::{sort_newest_first, Document, Fields, ListQuery, ID_FIELD};
use crate::error::{AppError, Result};
use crate::models::{Listing, Record};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;

/// Default page size for record listings.
pub const DEFAULT_LIST_LIMIT: u32 = 20;
/// Upper bound for `limit`, and for the over-fetch window.
pub const MAX_LIST_LIMIT: u32 = 100;

#[derive(Debug, Deserialize, Validate)]
pub struct ListParams {
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

/// Routes for one record kind, mounted at `path`.
pub fn routes<R: Record>(path: &str) -> Router<Arc<AppState>> {
    Router::new()
        .route(path, get(list::<R>).post(create::<R>))
        .route(
            &format!("{path}/{{id}}"),
            get(get_record::<R>)
                .put(update::<R>)
                .delete(delete::<R>),
        )
}

/// Documents to request from the store for a page of `limit`.
///
/// Collections sorted in memory fetch twice the page (capped) and sort that
/// window, so a busy collection can miss its newest documents.
fn fetch_window(listing: Listing, limit: u32) -> u32 {
    match listing {
        Listing::StoreOrder => limit,
        Listing::NewestFirst => limit.saturating_mul(2).min(MAX_LIST_LIMIT),
    }
}

async fn list<R: Record>(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(params): ValidatedQuery<ListParams>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ItemsResponse<Document>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);

    // Empty values (`?userId=`) mean "no filter"
    let filters = R::FILTER_FIELDS
        .iter()
        .filter_map(|field| {
            raw.get(*field)
                .filter(|value| !value.is_empty())
                .map(|value| (field.to_string(), value.clone()))
        })
        .collect();

    let query = ListQuery {
        filters,
        limit: fetch_window(R::LISTING, limit),
        newest_first_by: None,
    };
    let mut items = state.db.list(R::COLLECTION, &query).await?;

    if R::LISTING == Listing::NewestFirst {
        sort_newest_first(&mut items, R::TIMESTAMP_FIELD);
        items.truncate(limit as usize);
    }

    tracing::debug!(collection = R::COLLECTION, count = items.len(), "Listed records");
    Ok(Json(ItemsResponse { items }))
}

async fn create<R: Record>(
    State(state): State<Arc<AppState>>,
    ValidatedJson(mut record): ValidatedJson<R>,
) -> Result<(StatusCode, Json<Document>)> {
    record.stamp(chrono::Utc::now());
    let fields = record.into_fields()?;

    let doc = state.db.create(R::COLLECTION, fields).await?;

    tracing::info!(collection = R::COLLECTION, id = %doc.id, "Record created");
    Ok((StatusCode::CREATED, Json(doc)))
}

async fn get_record<R: Record>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Document>> {
    state
        .db
        .get(R::COLLECTION, &id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found::<R>(&id))
}

/// Merge arbitrary top-level fields into a record. The patch is not checked
/// against the record schema; only `id` is dropped.
async fn update<R: Record>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(mut patch): JsonBody<Fields>,
) -> Result<Json<Document>> {
    patch.remove(ID_FIELD);

    let doc = state
        .db
        .merge(R::COLLECTION, &id, patch)
        .await?
        .ok_or_else(|| not_found::<R>(&id))?;

    tracing::info!(collection = R::COLLECTION, id = %id, "Record updated");
    Ok(Json(doc))
}

async fn delete<R: Record>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.db.delete(R::COLLECTION, &id).await?;
    tracing::info!(collection = R::COLLECTION, id = %id, "Record deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn not_found<R: Record>(id: &str) -> AppError {
    AppError::NotFound(format!("{} {} not found", R::COLLECTION, id))
}
