// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.
//!
//! The four record kinds share one router; [`Record`] describes how each maps
//! onto its collection.

pub mod flag;
pub mod history;
pub mod object;
pub mod prompt;
pub mod secret;
pub mod user;

pub use flag::{Flag, FlagScope, FlagType};
pub use history::{HistoryEntry, InputType};
pub use object::RecognizedObject;
pub use prompt::{PromptIn, PromptLog, PromptUpdate};
pub use secret::{SecretCreate, SecretSummary, SecretUpdate, SecretValue};
pub use user::User;

use crate::db::Fields;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use validator::Validate;

/// How a collection orders its list results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    /// Whatever order the store returns.
    StoreOrder,
    /// Over-fetch, then sort by the timestamp field newest first in memory.
    ///
    /// Avoids a composite index on (filter field, timestamp). At high write
    /// volume the fetch window can miss recent documents.
    NewestFirst,
}

/// A record kind served by the generic record router.
pub trait Record: DeserializeOwned + Serialize + Validate + Send + 'static {
    /// Firestore collection name.
    const COLLECTION: &'static str;
    /// Timestamp defaulted to now on create (and used for sorting).
    const TIMESTAMP_FIELD: &'static str;
    /// Query parameters accepted as equality filters on list.
    const FILTER_FIELDS: &'static [&'static str];
    const LISTING: Listing;

    /// Set the timestamp field to `now` unless the caller supplied one.
    fn stamp(&mut self, now: DateTime<Utc>);

    /// Stored field map for this record.
    fn into_fields(self) -> Result<Fields, AppError> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(fields)) => Ok(fields),
            Ok(_) => Err(AppError::Internal(anyhow::anyhow!(
                "{} record did not serialize to an object",
                Self::COLLECTION
            ))),
            Err(e) => Err(AppError::Internal(e.into())),
        }
    }
}
