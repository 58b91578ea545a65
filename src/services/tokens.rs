// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Development bearer tokens (HS256).
//!
//! These stand in for real identity tokens while developing clients. They are
//! signed with the configured `AUTH_SIGNING_KEY` and verified against it.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Lifetime of a development token.
pub const DEV_TOKEN_TTL_SECS: u64 = 3600;
/// Role claim carried by every development token.
pub const DEV_TOKEN_ROLE: &str = "test_user";
const DEV_TOKEN_ISSUER: &str = "tralio-api-dev";

/// Claims of a development token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DevClaims {
    /// User id
    pub sub: String,
    pub email: Option<String>,
    pub role: String,
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
}

/// Mints and verifies development tokens.
pub struct DevTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl DevTokenIssuer {
    pub fn new(signing_key: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(signing_key),
            decoding_key: DecodingKey::from_secret(signing_key),
        }
    }

    /// Create a token for `user_id`, valid for [`DEV_TOKEN_TTL_SECS`].
    pub fn mint(&self, user_id: &str, email: Option<&str>) -> anyhow::Result<String> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

        let claims = DevClaims {
            sub: user_id.to_string(),
            email: email.map(str::to_string),
            role: DEV_TOKEN_ROLE.to_string(),
            iss: DEV_TOKEN_ISSUER.to_string(),
            iat: now as usize,
            exp: (now + DEV_TOKEN_TTL_SECS) as usize,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Check signature, expiry and issuer.
    pub fn verify(&self, token: &str) -> Result<DevClaims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.set_issuer(&[DEV_TOKEN_ISSUER]);

        decode::<DevClaims>(token, &self.decoding_key, &validation).map(|data| data.claims)
    }
}
