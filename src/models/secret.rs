// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Secret router request and response shapes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::{Validate, ValidationError};

const MAX_SECRET_KEY_LEN: usize = 255;

/// Check a key against Secret Manager's secret id rules.
pub fn validate_secret_key(key: &str) -> Result<(), ValidationError> {
    let valid_chars = key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if key.is_empty() || key.len() > MAX_SECRET_KEY_LEN || !valid_chars {
        let mut err = ValidationError::new("secret_key");
        err.message = Some("must be 1-255 characters of letters, digits, '_' or '-'".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SecretCreate {
    #[validate(custom(function = "validate_secret_key"))]
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecretUpdate {
    pub value: String,
}

/// Secret metadata as listed or created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecretSummary {
    pub id: String,
    pub labels: HashMap<String, String>,
}

/// Latest value of a secret.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecretValue {
    pub id: String,
    pub value: String,
}
