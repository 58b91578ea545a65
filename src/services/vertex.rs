// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Text generation through the Vertex AI `generateContent` REST API.

use crate::config::Config;
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Generates text for a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model used when a request does not name one.
    fn default_model(&self) -> &str;

    /// Generate a completion with the fixed output budget.
    ///
    /// Errors are already classified: [`AppError::UpstreamTransient`],
    /// [`AppError::QuotaExhausted`] or [`AppError::UpstreamRejected`].
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, AppError>;
}

/// Vertex AI client for Gemini publisher models.
pub struct VertexClient {
    http_client: reqwest::Client,
    base_url: String,
    project_id: String,
    location: String,
    default_model: String,
    max_output_tokens: u32,
    temperature: f32,
    max_retries: u32,
    /// `None` sends unauthenticated requests (local proxies and tests).
    auth: Option<gcloud_sdk::GoogleAuthTokenGenerator>,
}

impl VertexClient {
    /// Create a client using application default credentials, or the
    /// configured service account file.
    pub async fn new(config: &Config) -> Result<Self, AppError> {
        let token_source = match &config.credentials_file {
            Some(path) => gcloud_sdk::TokenSourceType::File(path.clone()),
            None => gcloud_sdk::TokenSourceType::Default,
        };

        let auth = gcloud_sdk::GoogleAuthTokenGenerator::new(
            token_source,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
        )
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Vertex AI credentials error: {}", e)))?;

        let base_url = format!("https://{}-aiplatform.googleapis.com", config.vertex_location);
        let client = Self::build(config, base_url, Some(auth))?;

        tracing::info!(
            location = %client.location,
            model = %client.default_model,
            "Vertex AI client initialized"
        );
        Ok(client)
    }

    /// Create an unauthenticated client against `base_url`.
    pub fn with_base_url(config: &Config, base_url: impl Into<String>) -> Result<Self, AppError> {
        Self::build(config, base_url.into(), None)
    }

    fn build(
        config: &Config,
        base_url: String,
        auth: Option<gcloud_sdk::GoogleAuthTokenGenerator>,
    ) -> Result<Self, AppError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client error: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: config.gcp_project_id.clone(),
            location: config.vertex_location.clone(),
            default_model: config.vertex_model.clone(),
            max_output_tokens: config.ai_max_output_tokens,
            temperature: config.ai_temperature,
            max_retries: config.upstream_max_retries,
            auth,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            self.base_url,
            self.project_id,
            self.location,
            urlencoding::encode(model)
        )
    }

    async fn generate_once(&self, model: &str, prompt: &str) -> Result<String, AppError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.max_output_tokens,
                temperature: self.temperature,
            },
        };

        let mut builder = self.http_client.post(self.endpoint(model)).json(&request);
        if let Some(auth) = &self.auth {
            let token = auth.create_token().await.map_err(|e| {
                AppError::UpstreamTransient(format!("failed to obtain access token: {e}"))
            })?;
            builder = builder.bearer_auth(token.token.as_sensitive_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::UpstreamTransient(format!("Vertex AI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unavailable>".into());
            return Err(classify_upstream(status, &body));
        }

        let payload: GenerateContentResponse = response.json().await.map_err(|e| {
            AppError::UpstreamRejected(format!("invalid Vertex AI response: {e}"))
        })?;

        extract_text(payload)
    }
}

#[async_trait]
impl TextGenerator for VertexClient {
    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String, AppError> {
        let mut attempt = 0;
        loop {
            match self.generate_once(model, prompt).await {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = RETRY_BASE_DELAY * 2u32.saturating_pow(attempt);
                    tracing::warn!(
                        model,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying Vertex AI request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

/// Map a failed `generateContent` response onto the upstream error taxonomy.
///
/// Only a 429 or an explicit `RESOURCE_EXHAUSTED` status counts as quota;
/// other errors that merely mention quotas (such as a missing quota project)
/// are terminal. Newly granted IAM roles take a while to propagate; the
/// resulting 403 is reported as transient alongside 5xx unavailability.
pub fn classify_upstream(status: StatusCode, body: &str) -> AppError {
    let detail = upstream_detail(body);
    let message = detail.message;

    if status == StatusCode::TOO_MANY_REQUESTS
        || detail.status.as_deref() == Some("RESOURCE_EXHAUSTED")
    {
        return AppError::QuotaExhausted(message);
    }

    let propagating =
        status == StatusCode::FORBIDDEN && body.to_ascii_lowercase().contains("propagat");
    if propagating
        || matches!(
            status,
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
        )
    {
        return AppError::UpstreamTransient(message);
    }

    AppError::UpstreamRejected(message)
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// `error` from a Google API error body; a non-JSON body becomes the message.
fn upstream_detail(body: &str) -> ErrorDetail {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }

    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| ErrorDetail {
            message: body.trim().to_string(),
            status: None,
        })
}

fn extract_text(payload: GenerateContentResponse) -> Result<String, AppError> {
    let candidate = payload
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AppError::UpstreamRejected("Vertex AI returned no candidates".into()))?;

    let text: String = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| part.text)
        .collect();

    if text.is_empty() {
        let reason = candidate.finish_reason.as_deref().unwrap_or("unknown");
        return Err(AppError::UpstreamRejected(format!(
            "Vertex AI returned no text (finish reason: {reason})"
        )));
    }
    Ok(text)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}
