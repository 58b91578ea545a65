// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase ID token verification.
//!
//! Tokens are RS256 JWTs signed by `securetoken@system.gserviceaccount.com`.
//! Google rotates those keys every few hours, so the published key set is
//! cached until its `Cache-Control: max-age` runs out and refetched once when
//! a token names a key id we have not seen.

use anyhow::Context;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::{HeaderMap, CACHE_CONTROL};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

const SECURETOKEN_KEYS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const SECURETOKEN_ISSUER: &str = "https://securetoken.google.com";
const KEY_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
/// Used when Google omits `max-age`.
const FALLBACK_KEY_TTL: Duration = Duration::from_secs(300);
const LEEWAY_SECS: u64 = 60;
/// Firebase uids are at most 128 characters.
const MAX_UID_LEN: usize = 128;

/// Identity taken from a verified Firebase ID token.
#[derive(Debug, Clone)]
pub struct FirebaseIdentity {
    pub uid: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub enum FirebaseAuthError {
    /// The token is invalid or was not issued for this project.
    Rejected(String),
    /// Google's signing keys could not be fetched.
    Unavailable(String),
}

impl FirebaseAuthError {
    fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

/// Signing keys from one fetch of the key set.
struct SigningKeys {
    by_kid: HashMap<String, Arc<DecodingKey>>,
    valid_until: Instant,
}

impl SigningKeys {
    fn fresh(&self) -> bool {
        self.valid_until > Instant::now()
    }
}

enum KeyStore {
    /// Google's published keys, fetched on demand.
    Remote {
        client: reqwest::Client,
        cached: RwLock<Option<SigningKeys>>,
        fetching: Mutex<()>,
    },
    /// One fixed key, for tests.
    Pinned { kid: String, key: Arc<DecodingKey> },
}

impl KeyStore {
    async fn key_for(&self, kid: &str) -> Result<Arc<DecodingKey>, FirebaseAuthError> {
        let (client, cached, fetching) = match self {
            KeyStore::Pinned { kid: pinned, key } => {
                return if kid == pinned {
                    Ok(key.clone())
                } else {
                    Err(FirebaseAuthError::rejected(format!("unknown key id {kid}")))
                };
            }
            KeyStore::Remote {
                client,
                cached,
                fetching,
            } => (client, cached, fetching),
        };

        let lookup = |keys: &Option<SigningKeys>| {
            keys.as_ref()
                .filter(|keys| keys.fresh())
                .and_then(|keys| keys.by_kid.get(kid).cloned())
        };

        if let Some(key) = lookup(&*cached.read().await) {
            return Ok(key);
        }

        let _fetch = fetching.lock().await;
        // Another request may have refreshed while we waited.
        if let Some(key) = lookup(&*cached.read().await) {
            return Ok(key);
        }

        let keys = fetch_signing_keys(client).await?;
        let key = keys.by_kid.get(kid).cloned();
        *cached.write().await = Some(keys);

        key.ok_or_else(|| FirebaseAuthError::rejected(format!("unknown key id {kid}")))
    }
}

/// Verifier for Firebase ID tokens issued for one project.
pub struct FirebaseTokenVerifier {
    project_id: String,
    issuer: String,
    keys: KeyStore,
}

impl FirebaseTokenVerifier {
    /// Create a verifier that checks tokens against Google's published keys.
    pub fn new(project_id: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(KEY_FETCH_TIMEOUT)
            .build()
            .context("failed building securetoken key client")?;

        let verifier = Self::with_store(
            project_id,
            KeyStore::Remote {
                client,
                cached: RwLock::new(None),
                fetching: Mutex::new(()),
            },
        );
        tracing::info!(issuer = %verifier.issuer, "Firebase ID token verification enabled");
        Ok(verifier)
    }

    /// Create a verifier that trusts exactly one key. No network access.
    pub fn new_with_static_key(
        project_id: &str,
        kid: impl Into<String>,
        decoding_key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        anyhow::ensure!(!kid.trim().is_empty(), "pinned key id must not be empty");

        Ok(Self::with_store(
            project_id,
            KeyStore::Pinned {
                kid,
                key: Arc::new(decoding_key),
            },
        ))
    }

    fn with_store(project_id: &str, keys: KeyStore) -> Self {
        Self {
            project_id: project_id.to_string(),
            issuer: format!("{SECURETOKEN_ISSUER}/{project_id}"),
            keys,
        }
    }

    /// Verify a Firebase ID token and return the caller's identity.
    pub async fn verify(&self, token: &str) -> Result<FirebaseIdentity, FirebaseAuthError> {
        let header = decode_header(token)
            .map_err(|e| FirebaseAuthError::rejected(format!("malformed token: {e}")))?;
        if header.alg != Algorithm::RS256 {
            return Err(FirebaseAuthError::rejected(format!(
                "ID tokens are RS256, got {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| FirebaseAuthError::rejected("token has no key id"))?;

        let key = self.keys.key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.project_id]);
        validation.leeway = LEEWAY_SECS;

        let claims = decode::<IdTokenClaims>(token, &key, &validation)
            .map_err(|e| FirebaseAuthError::rejected(e.to_string()))?
            .claims;
        check_claims(&claims, unix_now())?;

        tracing::debug!(uid = %claims.sub, "Verified Firebase ID token");
        Ok(FirebaseIdentity {
            uid: claims.sub,
            email: claims.email,
        })
    }
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    iat: Option<u64>,
    auth_time: Option<u64>,
    email: Option<String>,
}

/// Checks `jsonwebtoken` does not make: the uid shape and that the token was
/// issued, and the user signed in, no later than now.
fn check_claims(claims: &IdTokenClaims, now: u64) -> Result<(), FirebaseAuthError> {
    if claims.sub.is_empty() || claims.sub.len() > MAX_UID_LEN {
        return Err(FirebaseAuthError::rejected("sub is not a Firebase uid"));
    }

    let iat = claims
        .iat
        .ok_or_else(|| FirebaseAuthError::rejected("token has no iat"))?;
    let latest = now + LEEWAY_SECS;
    if iat > latest {
        return Err(FirebaseAuthError::rejected("token issued in the future"));
    }
    if claims.auth_time.is_some_and(|t| t > latest) {
        return Err(FirebaseAuthError::rejected("sign-in time is in the future"));
    }
    Ok(())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Debug, Deserialize)]
struct KeySet {
    keys: Vec<PublishedKey>,
}

#[derive(Debug, Deserialize)]
struct PublishedKey {
    kid: String,
    kty: String,
    alg: Option<String>,
    #[serde(rename = "use")]
    usage: Option<String>,
    n: String,
    e: String,
}

async fn fetch_signing_keys(client: &reqwest::Client) -> Result<SigningKeys, FirebaseAuthError> {
    let unavailable = |what: &str, e: &dyn std::fmt::Display| {
        FirebaseAuthError::Unavailable(format!("securetoken keys {what}: {e}"))
    };

    let response = client
        .get(SECURETOKEN_KEYS_URL)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| unavailable("request failed", &e))?;

    let ttl = max_age(response.headers()).unwrap_or(FALLBACK_KEY_TTL);
    let key_set: KeySet = response
        .json()
        .await
        .map_err(|e| unavailable("unreadable", &e))?;

    let by_kid = rs256_keys(key_set);
    if by_kid.is_empty() {
        return Err(unavailable("unusable", &"no RS256 signing keys"));
    }

    tracing::debug!(keys = by_kid.len(), ttl_secs = ttl.as_secs(), "Fetched securetoken keys");
    Ok(SigningKeys {
        by_kid,
        valid_until: Instant::now() + ttl,
    })
}

/// RSA signature keys from the published set. Anything else is skipped.
fn rs256_keys(key_set: KeySet) -> HashMap<String, Arc<DecodingKey>> {
    key_set
        .keys
        .into_iter()
        .filter(|k| k.kty == "RSA" && !k.kid.trim().is_empty())
        .filter(|k| k.alg.as_deref().map_or(true, |alg| alg == "RS256"))
        .filter(|k| k.usage.as_deref().map_or(true, |usage| usage == "sig"))
        .filter_map(|k| match DecodingKey::from_rsa_components(&k.n, &k.e) {
            Ok(key) => Some((k.kid, Arc::new(key))),
            Err(e) => {
                tracing::warn!(kid = %k.kid, error = %e, "Ignoring malformed securetoken key");
                None
            }
        })
        .collect()
}

/// `max-age` from a `Cache-Control` header, if present.
fn max_age(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(CACHE_CONTROL)?.to_str().ok()?;
    value
        .split(',')
        .map(str::trim)
        .find_map(|directive| directive.strip_prefix("max-age="))
        .and_then(|secs| secs.trim_matches('"').parse().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn claims(sub: &str, iat: Option<u64>, auth_time: Option<u64>) -> IdTokenClaims {
        IdTokenClaims {
            sub: sub.to_string(),
            iat,
            auth_time,
            email: None,
        }
    }

    #[test]
    fn max_age_from_cache_control() {
        let mut headers = HeaderMap::new();
        assert_eq!(max_age(&headers), None);

        headers.insert(
            CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=19845, must-revalidate, no-transform"),
        );
        assert_eq!(max_age(&headers), Some(Duration::from_secs(19845)));

        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=soon"));
        assert_eq!(max_age(&headers), None);
    }

    #[test]
    fn only_rs256_signature_keys_are_kept() {
        let key_set: KeySet = serde_json::from_value(serde_json::json!({
            "keys": [
                {"kid": "ec", "kty": "EC", "n": "AQAB", "e": "AQAB"},
                {"kid": "enc", "kty": "RSA", "use": "enc", "n": "AQAB", "e": "AQAB"},
                {"kid": "ps", "kty": "RSA", "alg": "PS256", "n": "AQAB", "e": "AQAB"},
                {"kid": "", "kty": "RSA", "n": "AQAB", "e": "AQAB"}
            ]
        }))
        .unwrap();

        assert!(rs256_keys(key_set).is_empty());
    }

    #[test]
    fn claim_times_and_uid() {
        let now = 1_800_000_000;
        assert!(check_claims(&claims("uid", Some(now), Some(now - 10)), now).is_ok());
        assert!(check_claims(&claims("uid", None, None), now).is_err());
        assert!(check_claims(&claims("uid", Some(now + 3600), None), now).is_err());
        assert!(check_claims(&claims("uid", Some(now), Some(now + 3600)), now).is_err());
        assert!(check_claims(&claims("", Some(now), None), now).is_err());
        assert!(check_claims(&claims(&"x".repeat(129), Some(now), None), now).is_err());
    }

    #[tokio::test]
    async fn pinned_verifier_rejects_garbage_and_blank_kid() {
        let verifier = FirebaseTokenVerifier::new_with_static_key(
            "demo-project",
            "known",
            DecodingKey::from_secret(b"unused"),
        )
        .unwrap();

        assert!(matches!(
            verifier.verify("not-a-jwt").await,
            Err(FirebaseAuthError::Rejected(_))
        ));
        assert!(FirebaseTokenVerifier::new_with_static_key(
            "demo-project",
            " ",
            DecodingKey::from_secret(b"unused")
        )
        .is_err());
    }
}
