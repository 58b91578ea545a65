// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! File-to-store ingestion through the same steps the CLI runs.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::json;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use tralio_api::db::{
    BatchWrite, Document, DocumentStore, Fields, ListQuery, MemoryDb, WriteMode,
};
use tralio_api::error::AppError;
use tralio_api::ingest::{
    coerce::coerce_row, ingest, source, synthetic, Collection, IngestError, IngestOptions,
    SYNTHETIC_SEED,
};

fn options(collection: Collection) -> IngestOptions {
    IngestOptions {
        collection,
        batch_size: 500,
        id_field: None,
        mode: WriteMode::Overwrite,
        dry_run: false,
    }
}

fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn prepare(collection: Collection, rows: Vec<Fields>) -> Vec<Fields> {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    rows.into_iter()
        .map(|row| coerce_row(collection, row, now))
        .collect()
}

async fn all_docs(store: &dyn DocumentStore, collection: &str) -> Vec<Document> {
    store
        .list(
            collection,
            &ListQuery {
                limit: 1000,
                ..ListQuery::default()
            },
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_csv_objects_with_id_field() {
    let file = write_temp(
        ".csv",
        "id,label,confidence,langs,createdBy,ts\n\
         obj-1,apple,0.91,\"es,fr\",u1,\n\
         obj-2,chair,,de,u2,2026-01-01T00:00:00Z\n",
    );

    let rows = prepare(Collection::Objects, source::load_file(file.path()).unwrap());
    let store = MemoryDb::new();
    let opts = IngestOptions {
        id_field: Some("id".to_string()),
        ..options(Collection::Objects)
    };

    let report = ingest(&store, rows, &opts).await.unwrap();
    assert_eq!(report.total, 2);
    assert_eq!(report.written, 2);
    assert_eq!(report.batches, 1);

    let apple = store.get("objects", "obj-1").await.unwrap().unwrap();
    assert_eq!(apple.fields.get("confidence"), Some(&json!(0.91)));
    assert_eq!(apple.fields.get("langs"), Some(&json!(["es", "fr"])));
    assert_eq!(apple.fields.get("ts"), Some(&json!("2026-03-01T12:00:00.000Z")));
    assert!(!apple.fields.contains_key("id"));

    let chair = store.get("objects", "obj-2").await.unwrap().unwrap();
    assert_eq!(chair.fields.get("langs"), Some(&json!(["de"])));
    assert_eq!(chair.fields.get("ts"), Some(&json!("2026-01-01T00:00:00.000Z")));
}

#[tokio::test]
async fn test_json_flags_items_wrapper() {
    let file = write_temp(
        ".json",
        r#"{"items": [
            {"key": "dark_mode", "value": "yes", "type": "BOOL"},
            {"key": "max_words", "value": "25", "type": "num"},
            {"key": "layout", "value": "{\"cols\": 2}", "type": "json"}
        ]}"#,
    );

    let rows = prepare(Collection::Flags, source::load_file(file.path()).unwrap());
    let store = MemoryDb::new();
    let opts = IngestOptions {
        id_field: Some("key".to_string()),
        ..options(Collection::Flags)
    };
    ingest(&store, rows, &opts).await.unwrap();

    for (id, expected) in [
        ("dark_mode", json!(true)),
        ("max_words", json!(25.0)),
        ("layout", json!({"cols": 2})),
    ] {
        let doc = store.get("flags", id).await.unwrap().unwrap();
        assert_eq!(doc.fields.get("value"), Some(&expected), "{id}");
        assert!(!doc.fields.contains_key("key"));
    }
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let rows = prepare(
        Collection::Users,
        synthetic::generate(Collection::Users, 12, SYNTHETIC_SEED, Utc::now()),
    );
    let store = MemoryDb::new();
    let opts = IngestOptions {
        dry_run: true,
        ..options(Collection::Users)
    };

    let report = ingest(&store, rows, &opts).await.unwrap();
    assert_eq!(report.total, 12);
    assert_eq!(report.written, 0);
    assert!(store.is_empty("users"));
}

#[tokio::test]
async fn test_batches_split_by_size() {
    let rows = prepare(
        Collection::History,
        synthetic::generate(Collection::History, 7, SYNTHETIC_SEED, Utc::now()),
    );
    let store = MemoryDb::new();
    let opts = IngestOptions {
        batch_size: 3,
        ..options(Collection::History)
    };

    let report = ingest(&store, rows, &opts).await.unwrap();
    assert_eq!(report.batches, 3);
    assert_eq!(store.len("history"), 7);
    assert_eq!(all_docs(&store, "history").await.len(), 7);
}

#[tokio::test]
async fn test_merge_mode_keeps_existing_fields() {
    let store = MemoryDb::new();
    let first = prepare(
        Collection::Users,
        vec![json!({"uid": "u1", "email": "a@example.com", "displayName": "A"})
            .as_object()
            .cloned()
            .unwrap()],
    );
    let opts = IngestOptions {
        id_field: Some("uid".to_string()),
        ..options(Collection::Users)
    };
    ingest(&store, first, &opts).await.unwrap();

    let second = vec![json!({"uid": "u1", "displayName": "Renamed"})
        .as_object()
        .cloned()
        .unwrap()];
    let merge = IngestOptions {
        mode: WriteMode::Merge,
        ..opts
    };
    ingest(&store, second, &merge).await.unwrap();

    let doc = store.get("users", "u1").await.unwrap().unwrap();
    assert_eq!(doc.fields.get("displayName"), Some(&json!("Renamed")));
    assert_eq!(doc.fields.get("email"), Some(&json!("a@example.com")));
}

#[tokio::test]
async fn test_invalid_batch_size_rejected() {
    let store = MemoryDb::new();
    for batch_size in [0, 501] {
        let opts = IngestOptions {
            batch_size,
            ..options(Collection::Users)
        };
        let err = ingest(&store, Vec::new(), &opts).await.unwrap_err();
        assert!(matches!(err, IngestError::BatchSize(n) if n == batch_size));
    }
}

/// Store that commits a fixed number of batches, then fails.
struct FlakyStore {
    inner: MemoryDb,
    batches_before_failure: usize,
    commits: AtomicUsize,
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn list(&self, collection: &str, query: &ListQuery) -> Result<Vec<Document>, AppError> {
        self.inner.list(collection, query).await
    }

    async fn create(&self, collection: &str, fields: Fields) -> Result<Document, AppError> {
        self.inner.create(collection, fields).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError> {
        self.inner.get(collection, id).await
    }

    async fn merge(
        &self,
        collection: &str,
        id: &str,
        patch: Fields,
    ) -> Result<Option<Document>, AppError> {
        self.inner.merge(collection, id, patch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.inner.delete(collection, id).await
    }

    async fn write_batch(
        &self,
        collection: &str,
        writes: Vec<BatchWrite>,
        mode: WriteMode,
    ) -> Result<(), AppError> {
        if self.commits.fetch_add(1, Ordering::SeqCst) >= self.batches_before_failure {
            return Err(AppError::Database("deadline exceeded".to_string()));
        }
        self.inner.write_batch(collection, writes, mode).await
    }
}

#[tokio::test]
async fn test_failed_batch_reports_committed_count() {
    let rows = prepare(
        Collection::Objects,
        synthetic::generate(Collection::Objects, 10, SYNTHETIC_SEED, Utc::now()),
    );
    let store = FlakyStore {
        inner: MemoryDb::new(),
        batches_before_failure: 2,
        commits: AtomicUsize::new(0),
    };
    let opts = IngestOptions {
        batch_size: 4,
        ..options(Collection::Objects)
    };

    let err = ingest(&store, rows, &opts).await.unwrap_err();
    assert_eq!(err.committed(), 8);
    assert!(matches!(err, IngestError::Commit { .. }));
    assert_eq!(store.inner.len("objects"), 8);
}

#[test]
fn test_unsupported_extension() {
    let file = write_temp(".xml", "<rows/>");
    let err = source::load_file(file.path()).unwrap_err();
    assert!(matches!(err, IngestError::UnsupportedFormat(_)));
}
