// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tralio API: REST facade for the TralioGo language-learning app.
//!
//! This crate exposes users, translation history, recognized objects,
//! feature flags, AI prompt logs and secrets over HTTP, backed by Firestore,
//! Vertex AI and Secret Manager.

pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::{Config, StoreBackend};
use db::{DocumentStore, FirestoreDb, MemoryDb};
use services::{
    DevTokenIssuer, FirebaseTokenVerifier, MemorySecrets, SecretManagerStore, SecretStore,
    TextGenerator, VertexClient,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn DocumentStore>,
    pub secrets: Arc<dyn SecretStore>,
    pub generator: Arc<dyn TextGenerator>,
    pub dev_tokens: DevTokenIssuer,
    /// Present when auth is enabled; verifies RS256 Firebase ID tokens.
    pub firebase: Option<FirebaseTokenVerifier>,
}

impl AppState {
    /// Connect every backend named by `config`.
    ///
    /// The memory store backend also keeps secrets in process; Vertex AI is
    /// always the real service.
    pub async fn connect(config: Config) -> anyhow::Result<Self> {
        let (db, secrets): (Arc<dyn DocumentStore>, Arc<dyn SecretStore>) =
            match config.store_backend {
                StoreBackend::Firestore => {
                    let db = FirestoreDb::new(
                        &config.gcp_project_id,
                        config.credentials_file.as_deref(),
                    )
                    .await?;
                    let secrets = SecretManagerStore::new(&config.gcp_project_id).await?;
                    (Arc::new(db), Arc::new(secrets))
                }
                StoreBackend::Memory => {
                    tracing::warn!("Using in-memory store; data is lost on restart");
                    (Arc::new(MemoryDb::new()), Arc::new(MemorySecrets::new()))
                }
            };

        let generator = Arc::new(VertexClient::new(&config).await?);

        let firebase = if config.require_auth {
            Some(FirebaseTokenVerifier::new(&config.gcp_project_id)?)
        } else {
            None
        };

        Ok(Self {
            dev_tokens: DevTokenIssuer::new(&config.auth_signing_key),
            config,
            db,
            secrets,
            generator,
            firebase,
        })
    }

    /// State backed entirely by in-process stores, with the given generator.
    pub fn in_memory(config: Config, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            dev_tokens: DevTokenIssuer::new(&config.auth_signing_key),
            config,
            db: Arc::new(MemoryDb::new()),
            secrets: Arc::new(MemorySecrets::new()),
            generator,
            firebase: None,
        }
    }
}
