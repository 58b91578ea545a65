// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Read once at startup; request handlers only see the resulting [`Config`].

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default Vertex AI region.
pub const DEFAULT_VERTEX_LOCATION: &str = "us-central1";
/// Default generative model used when a prompt carries no override.
pub const DEFAULT_VERTEX_MODEL: &str = "gemini-1.5-flash";

/// Which document store implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// In-process store; data is lost on restart.
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP project ID
    pub gcp_project_id: String,
    /// Vertex AI region (e.g. us-central1)
    pub vertex_location: String,
    /// Default Vertex AI model name
    pub vertex_model: String,
    /// Service account key file; application default credentials when unset
    pub credentials_file: Option<PathBuf>,
    /// Whether bearer tokens are required on API routes
    pub require_auth: bool,
    /// Whether `/auth/token` mints HS256 tokens and the middleware accepts them.
    /// Off unless `DEV_TOKENS_ENABLED=true`; only Firebase ID tokens pass then.
    pub dev_tokens_enabled: bool,
    /// HS256 key for development bearer tokens (raw bytes)
    pub auth_signing_key: Vec<u8>,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    pub store_backend: StoreBackend,
    /// Timeout applied to upstream HTTP calls
    pub upstream_timeout: Duration,
    /// Extra attempts for transient upstream failures (0 = none)
    pub upstream_max_retries: u32,
    /// Output token budget for each generation call
    pub ai_max_output_tokens: u32,
    /// Sampling temperature for each generation call
    pub ai_temperature: f32,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            vertex_location: DEFAULT_VERTEX_LOCATION.to_string(),
            vertex_model: DEFAULT_VERTEX_MODEL.to_string(),
            credentials_file: None,
            require_auth: false,
            dev_tokens_enabled: true,
            auth_signing_key: b"test_signing_key_32_bytes_long!!".to_vec(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            upstream_timeout: Duration::from_secs(60),
            upstream_max_retries: 0,
            ai_max_output_tokens: 500,
            ai_temperature: 0.7,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honoured for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let gcp_project_id = env::var("GCLOUD_PROJECT")
            .or_else(|_| env::var("GOOGLE_CLOUD_PROJECT"))
            .unwrap_or_else(|_| "local-dev".to_string());

        let require_auth = flag_var("REQUIRE_AUTH");
        let dev_tokens_enabled = flag_var("DEV_TOKENS_ENABLED");
        if require_auth && dev_tokens_enabled {
            tracing::warn!("DEV_TOKENS_ENABLED is on: anyone can mint an accepted bearer token");
        }

        let auth_signing_key = match env::var("AUTH_SIGNING_KEY") {
            Ok(key) if !key.trim().is_empty() => key.trim().as_bytes().to_vec(),
            _ if require_auth && dev_tokens_enabled => {
                return Err(ConfigError::Missing("AUTH_SIGNING_KEY"))
            }
            _ => {
                tracing::warn!("AUTH_SIGNING_KEY not set, using a random per-process key");
                random_signing_key()
            }
        };

        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "firestore".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "firestore" => StoreBackend::Firestore,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::Invalid(
                    "STORE_BACKEND",
                    format!("expected 'firestore' or 'memory', got '{other}'"),
                ))
            }
        };

        Ok(Self {
            gcp_project_id,
            vertex_location: env::var("VERTEX_LOCATION")
                .unwrap_or_else(|_| DEFAULT_VERTEX_LOCATION.to_string()),
            vertex_model: env::var("VERTEX_MODEL")
                .unwrap_or_else(|_| DEFAULT_VERTEX_MODEL.to_string()),
            credentials_file: env::var("GOOGLE_APPLICATION_CREDENTIALS")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            require_auth,
            dev_tokens_enabled,
            auth_signing_key,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: parse_var("PORT", 8080)?,
            store_backend,
            upstream_timeout: Duration::from_secs(parse_var("UPSTREAM_TIMEOUT_SECS", 60)?),
            upstream_max_retries: parse_var("UPSTREAM_MAX_RETRIES", 0)?,
            ai_max_output_tokens: parse_var("AI_MAX_OUTPUT_TOKENS", 500)?,
            ai_temperature: parse_var("AI_TEMPERATURE", 0.7)?,
        })
    }
}

/// Boolean switch: only a case-insensitive `true` turns it on.
fn flag_var(name: &str) -> bool {
    env::var(name)
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Parse an optional environment variable, falling back to `default` when unset.
fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::Invalid(name, e.to_string())),
        Err(_) => Ok(default),
    }
}

fn random_signing_key() -> Vec<u8> {
    use rand::RngCore;

    let mut key = vec![0u8; 32];
    rand::rng().fill_bytes(&mut key);
    key
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
