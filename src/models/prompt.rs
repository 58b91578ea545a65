// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Prompt log request and stored shapes.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Body of `POST /prompts`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PromptIn {
    #[validate(length(min = 1, message = "prompt must not be empty"))]
    pub prompt: String,
    /// Overrides the configured model.
    #[serde(default)]
    pub model: Option<String>,
}

/// Body of `PUT /prompts/{id}`. Only the note is editable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptUpdate {
    #[serde(default)]
    pub note: Option<String>,
}

/// Stored prompt log.
#[derive(Debug, Clone, Serialize)]
pub struct PromptLog {
    pub prompt: String,
    pub model: String,
    pub output: String,
    pub ts: String,
}
