// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bulk loading of records into the document store.
//!
//! Rows come from a CSV/JSON file or from the synthetic generator, are
//! coerced per collection, and are written in batches of at most
//! [`MAX_BATCH_SIZE`]. Each batch commits atomically; the load as a whole
//! does not, so a failure reports how many documents already landed.

pub mod coerce;
pub mod source;
pub mod synthetic;

use crate::db::{collections, BatchWrite, DocumentStore, Fields, WriteMode};
use crate::error::AppError;
use serde_json::Value;
use std::path::PathBuf;

/// Largest batch the store accepts in one commit.
pub const MAX_BATCH_SIZE: usize = 500;
/// Seed for synthetic data, so repeated runs produce the same records.
pub const SYNTHETIC_SEED: u64 = 1234;

/// Collections that can be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Collection {
    Users,
    History,
    Objects,
    Flags,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => collections::USERS,
            Collection::History => collections::HISTORY,
            Collection::Objects => collections::OBJECTS,
            Collection::Flags => collections::FLAGS,
        }
    }
}

/// How prepared rows are written.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub collection: Collection,
    pub batch_size: usize,
    /// Field holding an explicit document id. Always removed from the payload.
    pub id_field: Option<String>,
    pub mode: WriteMode,
    pub dry_run: bool,
}

/// Outcome of a load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Rows prepared for writing.
    pub total: usize,
    /// Documents committed.
    pub written: usize,
    pub batches: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported file type for {0}; use .csv or .json")]
    UnsupportedFormat(PathBuf),

    #[error("JSON must be a list of objects or an object with an 'items' list")]
    JsonShape,

    #[error("row {0} is not a JSON object")]
    NotAnObject(usize),

    #[error("batch size must be between 1 and {max}, got {0}", max = MAX_BATCH_SIZE)]
    BatchSize(usize),

    #[error("batch commit failed after {committed} documents were written: {source}")]
    Commit {
        committed: usize,
        #[source]
        source: AppError,
    },
}

impl IngestError {
    /// Documents committed before the failure.
    pub fn committed(&self) -> usize {
        match self {
            IngestError::Commit { committed, .. } => *committed,
            _ => 0,
        }
    }
}

/// Write `rows` in batches. Rows must already be coerced.
pub async fn ingest(
    store: &dyn DocumentStore,
    rows: Vec<Fields>,
    opts: &IngestOptions,
) -> Result<IngestReport, IngestError> {
    if opts.batch_size == 0 || opts.batch_size > MAX_BATCH_SIZE {
        return Err(IngestError::BatchSize(opts.batch_size));
    }

    let collection = opts.collection.name();
    let mut report = IngestReport {
        total: rows.len(),
        ..IngestReport::default()
    };

    if opts.dry_run {
        tracing::info!(collection, total = report.total, "Dry run, nothing written");
        return Ok(report);
    }

    let writes: Vec<BatchWrite> = rows
        .into_iter()
        .map(|row| to_batch_write(row, opts.id_field.as_deref()))
        .collect();

    for chunk in writes.chunks(opts.batch_size) {
        store
            .write_batch(collection, chunk.to_vec(), opts.mode)
            .await
            .map_err(|source| IngestError::Commit {
                committed: report.written,
                source,
            })?;

        report.written += chunk.len();
        report.batches += 1;
        tracing::info!(
            collection,
            batch = chunk.len(),
            written = report.written,
            "Committed batch"
        );
    }

    Ok(report)
}

/// Split the explicit id out of a row.
///
/// The id field is dropped from the payload even when it is empty and a
/// generated id is used instead.
fn to_batch_write(mut row: Fields, id_field: Option<&str>) -> BatchWrite {
    let id = id_field
        .and_then(|field| row.remove(field))
        .and_then(|value| match value {
            Value::String(s) if !s.is_empty() => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

    BatchWrite { id, fields: row }
}
