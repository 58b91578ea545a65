// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile records.

use super::{Listing, Record};
use crate::db::collections;
use crate::time_utils::serialize_opt_rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Role given to users created without one.
pub const DEFAULT_ROLE: &str = "student";

fn default_role() -> Option<String> {
    Some(DEFAULT_ROLE.to_string())
}

/// User profile. Email uniqueness is not enforced.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default = "default_role")]
    pub role: Option<String>,
    #[serde(default, serialize_with = "serialize_opt_rfc3339")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record for User {
    const COLLECTION: &'static str = collections::USERS;
    const TIMESTAMP_FIELD: &'static str = "createdAt";
    const FILTER_FIELDS: &'static [&'static str] = &["email"];
    const LISTING: Listing = Listing::StoreOrder;

    fn stamp(&mut self, now: DateTime<Utc>) {
        self.created_at.get_or_insert(now);
    }
}
