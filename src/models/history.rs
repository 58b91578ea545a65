// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Translation history entries.

use super::{Listing, Record};
use crate::db::collections;
use crate::time_utils::serialize_opt_rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// How the source text was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Text,
    Voice,
    Image,
}

/// One translation performed by a user.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub user_id: String,
    pub source_lang: String,
    pub target_lang: String,
    pub input_type: InputType,
    pub text: String,
    pub result: String,
    #[serde(default, serialize_with = "serialize_opt_rfc3339")]
    pub ts: Option<DateTime<Utc>>,
}

impl Record for HistoryEntry {
    const COLLECTION: &'static str = collections::HISTORY;
    const TIMESTAMP_FIELD: &'static str = "ts";
    const FILTER_FIELDS: &'static [&'static str] = &["userId"];
    const LISTING: Listing = Listing::NewestFirst;

    fn stamp(&mut self, now: DateTime<Utc>) {
        self.ts.get_or_insert(now);
    }
}
