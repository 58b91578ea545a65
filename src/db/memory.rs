// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process [`DocumentStore`] for local development and tests.
//!
//! Collections keep insertion order, which stands in for Firestore's
//! store-defined order.

use super::{
    generate_document_id, sort_newest_first, BatchWrite, Document, DocumentStore, Fields,
    ListQuery, WriteMode,
};
use crate::error::AppError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

/// In-memory document store.
#[derive(Clone, Default)]
pub struct MemoryDb {
    collections: Arc<DashMap<String, Vec<Document>>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

fn matches(doc: &Document, filters: &[(String, String)]) -> bool {
    filters.iter().all(|(field, expected)| {
        matches!(doc.fields.get(field), Some(Value::String(v)) if v == expected)
    })
}

fn apply_merge(target: &mut Fields, patch: Fields) {
    for (key, value) in patch {
        target.insert(key, value);
    }
}

#[async_trait]
impl DocumentStore for MemoryDb {
    async fn list(&self, collection: &str, query: &ListQuery) -> Result<Vec<Document>, AppError> {
        let mut docs: Vec<Document> = self
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| matches(doc, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(field) = query.newest_first_by {
            sort_newest_first(&mut docs, field);
        }
        docs.truncate(query.limit as usize);
        Ok(docs)
    }

    async fn create(&self, collection: &str, fields: Fields) -> Result<Document, AppError> {
        let doc = Document::new(generate_document_id(), fields);
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(doc.clone());
        Ok(doc)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| doc.id == id).cloned()))
    }

    async fn merge(
        &self,
        collection: &str,
        id: &str,
        patch: Fields,
    ) -> Result<Option<Document>, AppError> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(None);
        };
        let Some(doc) = docs.iter_mut().find(|doc| doc.id == id) else {
            return Ok(None);
        };

        apply_merge(&mut doc.fields, patch);
        doc.fields.remove(super::ID_FIELD);
        Ok(Some(doc.clone()))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        if let Some(mut docs) = self.collections.get_mut(collection) {
            docs.retain(|doc| doc.id != id);
        }
        Ok(())
    }

    async fn write_batch(
        &self,
        collection: &str,
        writes: Vec<BatchWrite>,
        mode: WriteMode,
    ) -> Result<(), AppError> {
        let mut docs = self.collections.entry(collection.to_string()).or_default();

        for write in writes {
            let id = write.id.unwrap_or_else(generate_document_id);
            match docs.iter().position(|doc| doc.id == id) {
                Some(idx) => match mode {
                    WriteMode::Overwrite => docs[idx] = Document::new(id, write.fields),
                    WriteMode::Merge => {
                        apply_merge(&mut docs[idx].fields, write.fields);
                        docs[idx].fields.remove(super::ID_FIELD);
                    }
                },
                None => docs.push(Document::new(id, write.fields)),
            }
        }
        Ok(())
    }
}
