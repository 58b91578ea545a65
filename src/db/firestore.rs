// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed [`DocumentStore`].
//!
//! Documents are read and written as schemaless field maps. The crate injects
//! bookkeeping keys (`_firestore_id` and friends) into every deserialized
//! document; those are stripped before a [`Document`] leaves this module.

use super::{
    generate_document_id, BatchWrite, Document, DocumentStore, Fields, ListQuery, WriteMode,
};
use crate::error::AppError;
use async_trait::async_trait;
use std::path::Path;

const FIRESTORE_META_PREFIX: &str = "_firestore_";

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    /// `credentials_file` selects a service account key instead of
    /// application default credentials.
    pub async fn new(project_id: &str, credentials_file: Option<&Path>) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = match credentials_file {
            Some(path) => {
                firestore::FirestoreDb::with_options_token_source(
                    firestore::FirestoreDbOptions::new(project_id.to_string()),
                    gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
                    gcloud_sdk::TokenSourceType::File(path.to_path_buf()),
                )
                .await
            }
            None => firestore::FirestoreDb::new(project_id).await,
        }
        .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    /// Read one document, keeping the known id.
    async fn fetch(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError> {
        let fields: Option<Fields> = self
            .client
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(fields.map(|fields| Document::new(id, strip_meta(fields))))
    }
}

#[async_trait]
impl DocumentStore for FirestoreDb {
    async fn list(&self, collection: &str, query: &ListQuery) -> Result<Vec<Document>, AppError> {
        let mut select = self.client.fluent().select().from(collection);

        if !query.filters.is_empty() {
            let filters = query.filters.clone();
            select = select.filter(move |q| {
                let conditions: Vec<_> = filters
                    .iter()
                    .map(|(field, value)| q.field(field.as_str()).eq(value.clone()))
                    .collect();
                q.for_all(conditions)
            });
        }

        if let Some(field) = query.newest_first_by {
            select = select.order_by([(field, firestore::FirestoreQueryDirection::Descending)]);
        }

        let rows: Vec<Fields> = select
            .limit(query.limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(into_document).collect()
    }

    async fn create(&self, collection: &str, fields: Fields) -> Result<Document, AppError> {
        let id = generate_document_id();

        let stored: Fields = self
            .client
            .fluent()
            .insert()
            .into(collection)
            .document_id(&id)
            .object(&fields)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(collection, id = %id, "Document created");
        Ok(Document::new(id, strip_meta(stored)))
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError> {
        self.fetch(collection, id).await
    }

    async fn merge(
        &self,
        collection: &str,
        id: &str,
        patch: Fields,
    ) -> Result<Option<Document>, AppError> {
        let Some(existing) = self.fetch(collection, id).await? else {
            return Ok(None);
        };
        if patch.is_empty() {
            return Ok(Some(existing));
        }

        let mask: Vec<String> = patch.keys().map(|key| field_path(key)).collect();

        let merged: Fields = self
            .client
            .fluent()
            .update()
            .fields(mask)
            .in_col(collection)
            .document_id(id)
            .object(&patch)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Some(Document::new(id, strip_meta(merged))))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.client
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn write_batch(
        &self,
        collection: &str,
        writes: Vec<BatchWrite>,
        mode: WriteMode,
    ) -> Result<(), AppError> {
        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        for write in &writes {
            let id = write.id.clone().unwrap_or_else(generate_document_id);
            let update = self.client.fluent().update();
            let update = match mode {
                WriteMode::Overwrite => update.in_col(collection),
                WriteMode::Merge => update
                    .fields(write.fields.keys().map(|key| field_path(key)))
                    .in_col(collection),
            };

            update
                .document_id(&id)
                .object(&write.fields)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!(
                        "Failed to add write to transaction for {}: {}",
                        collection, e
                    ))
                })?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit batch write: {}", e)))?;

        tracing::debug!(collection, count = writes.len(), ?mode, "Batch committed");
        Ok(())
    }
}

/// Turn a deserialized row into a [`Document`] using the injected id.
fn into_document(mut fields: Fields) -> Result<Document, AppError> {
    let id = fields
        .remove("_firestore_id")
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or_else(|| AppError::Database("Document returned without an id".to_string()))?;
    Ok(Document::new(id, strip_meta(fields)))
}

fn strip_meta(mut fields: Fields) -> Fields {
    fields.retain(|key, _| !key.starts_with(FIRESTORE_META_PREFIX));
    fields
}

/// Quote a top-level key as a Firestore field path.
///
/// Simple identifiers pass through; anything else is backtick-quoted so a key
/// such as `a.b` names one field instead of a nested path.
fn field_path(key: &str) -> String {
    let mut chars = key.chars();
    let simple = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if simple {
        key.to_string()
    } else {
        format!("`{}`", key.replace('\\', "\\\\").replace('`', "\\`"))
    }
}
