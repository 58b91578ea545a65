// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Objects recognized in camera images.

use super::{Listing, Record};
use crate::db::collections;
use crate::time_utils::serialize_opt_rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A recognized object with its label translations.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecognizedObject {
    pub label: String,
    /// Recognizer confidence; range is not checked.
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub langs: Option<Vec<String>>,
    #[serde(default)]
    pub tts_url: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default, serialize_with = "serialize_opt_rfc3339")]
    pub ts: Option<DateTime<Utc>>,
}

impl Record for RecognizedObject {
    const COLLECTION: &'static str = collections::OBJECTS;
    const TIMESTAMP_FIELD: &'static str = "ts";
    const FILTER_FIELDS: &'static [&'static str] = &["createdBy"];
    const LISTING: Listing = Listing::NewestFirst;

    fn stamp(&mut self, now: DateTime<Utc>) {
        self.ts.get_or_insert(now);
    }
}
