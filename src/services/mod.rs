// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - clients for the managed backends.

pub mod firebase_auth;
pub mod secrets;
pub mod tokens;
pub mod vertex;

pub use firebase_auth::{FirebaseAuthError, FirebaseIdentity, FirebaseTokenVerifier};
pub use secrets::{MemorySecrets, SecretError, SecretManagerStore, SecretStore, SecretVersion};
pub use tokens::{DevClaims, DevTokenIssuer};
pub use vertex::{TextGenerator, VertexClient};
