// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Secret storage backed by Secret Manager.
//!
//! Each key maps to one secret; every write appends a version and reads
//! return the newest one unless a version is named. Uses the official
//! google-cloud-secretmanager-v1 SDK.

use crate::error::AppError;
use crate::models::SecretSummary;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Which version of a secret to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretVersion {
    Latest,
    /// 1-based version number.
    Number(u64),
}

impl SecretVersion {
    fn as_path_segment(self) -> String {
        match self {
            SecretVersion::Latest => "latest".to_string(),
            SecretVersion::Number(n) => n.to_string(),
        }
    }
}

/// Secret backend errors.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret already exists: {0}")]
    AlreadyExists(String),

    #[error("secret not found: {0}")]
    NotFound(String),

    #[error("secret backend error: {0}")]
    Upstream(String),
}

impl From<SecretError> for AppError {
    fn from(err: SecretError) -> Self {
        match err {
            SecretError::NotFound(key) => AppError::NotFound(format!("Secret {key} not found")),
            SecretError::AlreadyExists(key) => {
                AppError::BadRequest(format!("Secret {key} already exists"))
            }
            SecretError::Upstream(msg) => AppError::UpstreamRejected(msg),
        }
    }
}

/// A versioned key/value secret store.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Create secret metadata. Fails with `AlreadyExists` if the key is taken.
    async fn create_secret(
        &self,
        key: &str,
        labels: &HashMap<String, String>,
    ) -> Result<(), SecretError>;

    /// Append a new version holding `value`.
    async fn add_version(&self, key: &str, value: &str) -> Result<(), SecretError>;

    async fn access(&self, key: &str, version: SecretVersion) -> Result<String, SecretError>;

    /// List secrets whose key starts with `prefix`.
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<SecretSummary>, SecretError>;

    /// Remove a secret and all of its versions. Missing keys succeed.
    async fn delete(&self, key: &str) -> Result<(), SecretError>;
}

/// Secret Manager client for one project.
pub struct SecretManagerStore {
    project_id: String,
    client: google_cloud_secretmanager_v1::client::SecretManagerService,
}

impl SecretManagerStore {
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        use google_cloud_secretmanager_v1::client::SecretManagerService;

        let client = SecretManagerService::builder().build().await.map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Secret Manager client error: {}", e))
        })?;

        tracing::info!(project = project_id, "Secret Manager client initialized");

        Ok(Self {
            project_id: project_id.to_string(),
            client,
        })
    }

    fn project_path(&self) -> String {
        format!("projects/{}", self.project_id)
    }

    fn secret_path(&self, key: &str) -> String {
        format!("projects/{}/secrets/{}", self.project_id, key)
    }
}

/// Map an SDK error onto [`SecretError`] by its RPC status code.
fn classify(key: &str, err: google_cloud_gax::error::Error) -> SecretError {
    use google_cloud_gax::error::rpc::Code;

    match err.status().map(|status| status.code) {
        Some(Code::AlreadyExists) => SecretError::AlreadyExists(key.to_string()),
        Some(Code::NotFound) => SecretError::NotFound(key.to_string()),
        _ => SecretError::Upstream(err.to_string()),
    }
}

/// Key of a secret from its resource name (`projects/p/secrets/<key>`).
fn key_from_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

#[async_trait]
impl SecretStore for SecretManagerStore {
    async fn create_secret(
        &self,
        key: &str,
        labels: &HashMap<String, String>,
    ) -> Result<(), SecretError> {
        use google_cloud_secretmanager_v1::model::{replication, Replication, Secret};

        let secret = Secret::default()
            .set_replication(
                Replication::default().set_automatic(replication::Automatic::default()),
            )
            .set_labels(labels.clone());

        self.client
            .create_secret()
            .set_parent(self.project_path())
            .set_secret_id(key)
            .set_secret(secret)
            .send()
            .await
            .map_err(|e| classify(key, e))?;

        tracing::info!(key, "Secret created");
        Ok(())
    }

    async fn add_version(&self, key: &str, value: &str) -> Result<(), SecretError> {
        use google_cloud_secretmanager_v1::model::SecretPayload;

        let version = self
            .client
            .add_secret_version()
            .set_parent(self.secret_path(key))
            .set_payload(
                SecretPayload::default().set_data(axum::body::Bytes::from(value.to_string())),
            )
            .send()
            .await
            .map_err(|e| classify(key, e))?;

        tracing::debug!(key, version = %version.name, "Secret version added");
        Ok(())
    }

    async fn access(&self, key: &str, version: SecretVersion) -> Result<String, SecretError> {
        let response = self
            .client
            .access_secret_version()
            .set_name(format!(
                "{}/versions/{}",
                self.secret_path(key),
                version.as_path_segment()
            ))
            .send()
            .await
            .map_err(|e| classify(key, e))?;

        let data = response.payload.map(|payload| payload.data).unwrap_or_default();

        String::from_utf8(data.to_vec())
            .map_err(|_| SecretError::Upstream(format!("secret {key} is not valid UTF-8")))
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<SecretSummary>, SecretError> {
        let mut items = Vec::new();
        let mut page_token = String::new();

        loop {
            let mut request = self
                .client
                .list_secrets()
                .set_parent(self.project_path())
                .set_page_token(page_token.clone());
            if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
                request = request.set_filter(format!("name:{prefix}"));
            }

            let page = request
                .send()
                .await
                .map_err(|e| SecretError::Upstream(e.to_string()))?;

            for secret in page.secrets {
                let id = key_from_name(&secret.name).to_string();
                // The name filter matches substrings; keep true prefixes only.
                if prefix.map_or(true, |p| id.starts_with(p)) {
                    items.push(SecretSummary {
                        id,
                        labels: secret.labels.into_iter().collect(),
                    });
                }
            }

            if page.next_page_token.is_empty() {
                break;
            }
            page_token = page.next_page_token;
        }

        Ok(items)
    }

    async fn delete(&self, key: &str) -> Result<(), SecretError> {
        let result = self
            .client
            .delete_secret()
            .set_name(self.secret_path(key))
            .send()
            .await;

        match result.map_err(|e| classify(key, e)) {
            Ok(()) | Err(SecretError::NotFound(_)) => {
                tracing::info!(key, "Secret deleted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct MemorySecret {
    labels: HashMap<String, String>,
    versions: Vec<String>,
}

/// In-process [`SecretStore`] for local development and tests.
#[derive(Clone, Default)]
pub struct MemorySecrets {
    secrets: Arc<DashMap<String, MemorySecret>>,
}

impl MemorySecrets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of versions stored for `key`.
    pub fn version_count(&self, key: &str) -> usize {
        self.secrets
            .get(key)
            .map(|secret| secret.versions.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl SecretStore for MemorySecrets {
    async fn create_secret(
        &self,
        key: &str,
        labels: &HashMap<String, String>,
    ) -> Result<(), SecretError> {
        match self.secrets.entry(key.to_string()) {
            Entry::Occupied(_) => Err(SecretError::AlreadyExists(key.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(MemorySecret {
                    labels: labels.clone(),
                    versions: Vec::new(),
                });
                Ok(())
            }
        }
    }

    async fn add_version(&self, key: &str, value: &str) -> Result<(), SecretError> {
        let mut secret = self
            .secrets
            .get_mut(key)
            .ok_or_else(|| SecretError::NotFound(key.to_string()))?;
        secret.versions.push(value.to_string());
        Ok(())
    }

    async fn access(&self, key: &str, version: SecretVersion) -> Result<String, SecretError> {
        let secret = self
            .secrets
            .get(key)
            .ok_or_else(|| SecretError::NotFound(key.to_string()))?;

        let value = match version {
            SecretVersion::Latest => secret.versions.last(),
            SecretVersion::Number(n) => usize::try_from(n)
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|idx| secret.versions.get(idx)),
        };

        value
            .cloned()
            .ok_or_else(|| SecretError::NotFound(key.to_string()))
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<SecretSummary>, SecretError> {
        let mut items: Vec<SecretSummary> = self
            .secrets
            .iter()
            .filter(|entry| prefix.map_or(true, |p| entry.key().starts_with(p)))
            .map(|entry| SecretSummary {
                id: entry.key().clone(),
                labels: entry.labels.clone(),
            })
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    async fn delete(&self, key: &str) -> Result<(), SecretError> {
        self.secrets.remove(key);
        Ok(())
    }
}
