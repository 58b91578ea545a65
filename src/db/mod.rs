// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: the schemaless document store behind every collection.
//!
//! Handlers only talk to [`DocumentStore`]; [`FirestoreDb`] is the production
//! backend and [`MemoryDb`] serves local development and tests.

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreDb;
pub use self::memory::MemoryDb;

use crate::error::AppError;
use async_trait::async_trait;
use rand::Rng;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const HISTORY: &str = "history";
    pub const OBJECTS: &str = "objects";
    pub const FLAGS: &str = "flags";
    pub const PROMPTS: &str = "prompts";

    /// Collections the ingestion tool may write to.
    pub const INGESTIBLE: [&str; 4] = [USERS, HISTORY, OBJECTS, FLAGS];
}

/// Field map of a stored document (everything except its id).
pub type Fields = serde_json::Map<String, Value>;

/// Key that must never be stored as a field; the document id owns it.
pub const ID_FIELD: &str = "id";

const DOCUMENT_ID_LEN: usize = 20;
const DOCUMENT_ID_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// A stored document: store-assigned id plus its fields.
///
/// Serializes flat, as `{"id": ..., ...fields}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, mut fields: Fields) -> Self {
        fields.remove(ID_FIELD);
        Self {
            id: id.into(),
            fields,
        }
    }

    /// String value of a field, if present and a string.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(ID_FIELD, &self.id)?;
        for (key, value) in &self.fields {
            if key != ID_FIELD {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

/// Parameters for listing a collection.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Equality filters (field, value), combined with AND.
    pub filters: Vec<(String, String)>,
    pub limit: u32,
    /// Ask the store to order by this field, newest first.
    pub newest_first_by: Option<&'static str>,
}

/// How a batch write treats an existing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Create or fully replace.
    Overwrite,
    /// Create or merge top-level fields.
    Merge,
}

/// One document in a batch write; `id: None` means store-generated.
#[derive(Debug, Clone)]
pub struct BatchWrite {
    pub id: Option<String>,
    pub fields: Fields,
}

/// The managed document store behind every collection.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List documents matching `query`.
    async fn list(&self, collection: &str, query: &ListQuery) -> Result<Vec<Document>, AppError>;

    /// Store a new document under a generated id.
    async fn create(&self, collection: &str, fields: Fields) -> Result<Document, AppError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError>;

    /// Merge top-level fields into an existing document.
    ///
    /// Returns `Ok(None)` without writing when the document does not exist.
    async fn merge(
        &self,
        collection: &str,
        id: &str,
        patch: Fields,
    ) -> Result<Option<Document>, AppError>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError>;

    /// Commit `writes` atomically; either all land or none do.
    async fn write_batch(
        &self,
        collection: &str,
        writes: Vec<BatchWrite>,
        mode: WriteMode,
    ) -> Result<(), AppError>;
}

/// Generate a Firestore-style 20 character document id.
pub fn generate_document_id() -> String {
    let mut rng = rand::rng();
    (0..DOCUMENT_ID_LEN)
        .map(|_| {
            let idx = rng.random_range(0..DOCUMENT_ID_ALPHABET.len());
            DOCUMENT_ID_ALPHABET[idx] as char
        })
        .collect()
}

/// Stable sort by a timestamp field, newest first.
///
/// Documents missing the field sort last; ties keep their incoming order.
pub fn sort_newest_first(docs: &mut [Document], field: &str) {
    docs.sort_by(|a, b| b.str_field(field).cmp(&a.str_field(field)));
}
