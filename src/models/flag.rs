// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Feature flags.

use super::{Listing, Record};
use crate::db::collections;
use crate::time_utils::serialize_opt_rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

/// Declared type of a flag value. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagType {
    Bool,
    Str,
    Num,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagScope {
    #[default]
    Global,
    User,
}

fn default_scope() -> Option<FlagScope> {
    Some(FlagScope::Global)
}

/// A feature flag. `value` keeps whatever JSON shape the client sent.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Flag {
    pub key: String,
    /// Missing values are stored as `null`.
    #[serde(default)]
    pub value: Value,
    #[serde(rename = "type", default)]
    pub flag_type: Option<FlagType>,
    #[serde(default = "default_scope")]
    pub scope: Option<FlagScope>,
    #[serde(default, serialize_with = "serialize_opt_rfc3339")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record for Flag {
    const COLLECTION: &'static str = collections::FLAGS;
    const TIMESTAMP_FIELD: &'static str = "updatedAt";
    const FILTER_FIELDS: &'static [&'static str] = &["scope", "key"];
    const LISTING: Listing = Listing::StoreOrder;

    fn stamp(&mut self, now: DateTime<Utc>) {
        self.updated_at.get_or_insert(now);
    }
}
