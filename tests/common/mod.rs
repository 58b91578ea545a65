// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use tralio_api::config::Config;
use tralio_api::db::FirestoreDb;
use tralio_api::error::AppError;
use tralio_api::routes::create_router;
use tralio_api::services::TextGenerator;
use tralio_api::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection to the emulator.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project", None)
        .await
        .expect("Failed to connect to Firestore emulator")
}

type FailureFn = Box<dyn Fn() -> AppError + Send + Sync>;

/// Generator stand-in that echoes a fixed reply or fails on demand.
#[allow(dead_code)]
pub struct FakeGenerator {
    reply: String,
    failure: Option<FailureFn>,
    calls: Mutex<Vec<(String, String)>>,
}

#[allow(dead_code)]
impl FakeGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(failure: impl Fn() -> AppError + Send + Sync + 'static) -> Self {
        Self {
            reply: String::new(),
            failure: Some(Box::new(failure)),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// (model, prompt) pairs seen so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    fn default_model(&self) -> &str {
        "gemini-1.5-flash"
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, AppError> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), prompt.to_string()));
        match &self.failure {
            Some(failure) => Err(failure()),
            None => Ok(format!("{}: {}", self.reply, prompt)),
        }
    }
}

/// Create a test app with in-memory backends and auth disabled.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    create_test_app_with(Config::test_default(), Arc::new(FakeGenerator::replying("echo")))
}

#[allow(dead_code)]
pub fn create_test_app_with(
    config: Config,
    generator: Arc<dyn TextGenerator>,
) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::in_memory(config, generator));
    (create_router(state.clone()), state)
}

/// Send a request and return the status plus the JSON body (`Null` if empty).
#[allow(dead_code)]
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, json)
}
