//! Bearer token verification.
//!
//! Every `/chat` request carries `Authorization: Bearer <token>`. A
//! [`TokenVerifier`] turns the token into the caller's [`UserId`] or fails with
//! [`OraculoError::Unauthenticated`]; nothing downstream ever sees the raw token.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::AuthConfig;
use crate::error::{OraculoError, Result};
use crate::models::UserId;

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<UserId>;

    /// Short label for logs.
    fn scheme(&self) -> &'static str;
}

/// Static API keys. Entries are `user=key` or a bare `key`.
pub struct ApiKeyVerifier {
    keys: HashMap<String, UserId>,
}

impl ApiKeyVerifier {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keys = HashMap::new();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }

            let (user, key) = match entry.split_once('=') {
                Some((user, key)) if !user.trim().is_empty() && !key.trim().is_empty() => {
                    (UserId::new(user.trim()), key.trim())
                }
                _ => (user_id_from_api_key(entry), entry),
            };
            keys.insert(key.to_string(), user);
        }
        Self { keys }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl TokenVerifier for ApiKeyVerifier {
    async fn verify(&self, token: &str) -> Result<UserId> {
        self.keys
            .get(token)
            .cloned()
            .ok_or_else(|| OraculoError::Unauthenticated("Invalid API key".to_string()))
    }

    fn scheme(&self) -> &'static str {
        "api_key"
    }
}

/// Stable identity for a bare key that never exposes the key itself.
fn user_id_from_api_key(api_key: &str) -> UserId {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    let digest = hasher.finalize();
    let hash = format!("{digest:x}");
    UserId::new(format!("key_{}", &hash[..16]))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

/// HS256 JWTs. `sub` is the user id, `exp` is mandatory.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str, leeway_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_secs;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<UserId> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => "Token expired",
                ErrorKind::InvalidSignature => "Invalid token signature",
                _ => "Invalid token",
            };
            OraculoError::Unauthenticated(reason.to_string())
        })?;

        let sub = data.claims.sub.trim();
        if sub.is_empty() {
            return Err(OraculoError::Unauthenticated(
                "Token has no subject".to_string(),
            ));
        }
        Ok(UserId::new(sub))
    }

    fn scheme(&self) -> &'static str {
        "jwt"
    }
}

/// Tries each verifier in order and accepts the first success.
pub struct ChainVerifier {
    verifiers: Vec<Arc<dyn TokenVerifier>>,
}

impl ChainVerifier {
    pub fn new(verifiers: Vec<Arc<dyn TokenVerifier>>) -> Self {
        Self { verifiers }
    }

    pub fn is_empty(&self) -> bool {
        self.verifiers.is_empty()
    }
}

#[async_trait]
impl TokenVerifier for ChainVerifier {
    async fn verify(&self, token: &str) -> Result<UserId> {
        if self.verifiers.is_empty() {
            return Err(OraculoError::Unauthenticated(
                "Authentication is not configured".to_string(),
            ));
        }

        let mut last_error = None;
        for verifier in &self.verifiers {
            match verifier.verify(token).await {
                Ok(user) => return Ok(user),
                Err(e) => {
                    tracing::debug!(scheme = verifier.scheme(), error = %e, "Token rejected");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| OraculoError::Unauthenticated("Invalid token".to_string())))
    }

    fn scheme(&self) -> &'static str {
        "chain"
    }
}

/// JWT first (when a secret is set), then static API keys.
pub fn verifier_from_config(config: &AuthConfig) -> Arc<dyn TokenVerifier> {
    let mut verifiers: Vec<Arc<dyn TokenVerifier>> = Vec::new();

    if let Some(secret) = &config.jwt_secret {
        verifiers.push(Arc::new(JwtVerifier::new(secret, config.jwt_leeway_secs)));
    }

    let api_keys = ApiKeyVerifier::new(&config.api_keys);
    if !api_keys.is_empty() {
        verifiers.push(Arc::new(api_keys));
    }

    if verifiers.is_empty() {
        tracing::warn!(
            "No JWT_SECRET or ORACULO_API_KEYS configured; every /chat request will be rejected"
        );
    }

    Arc::new(ChainVerifier::new(verifiers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn token(sub: &str, exp_offset_secs: i64, secret: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp: chrono::Utc::now().timestamp() + exp_offset_secs,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn api_key_pairs_map_to_named_users() {
        let verifier = ApiKeyVerifier::new(["alice=k1", "bob = k2 "]);

        assert_eq!(verifier.verify("k1").await.unwrap().as_str(), "alice");
        assert_eq!(verifier.verify("k2").await.unwrap().as_str(), "bob");
        assert!(matches!(
            verifier.verify("k3").await,
            Err(OraculoError::Unauthenticated(_))
        ));
    }

    #[tokio::test]
    async fn bare_api_key_gets_stable_hashed_identity() {
        let verifier = ApiKeyVerifier::new(["super-secret"]);

        let user = verifier.verify("super-secret").await.unwrap();
        assert!(user.as_str().starts_with("key_"));
        assert!(!user.as_str().contains("super-secret"));
        assert_eq!(user.as_str().len(), "key_".len() + 16);
        assert_eq!(user, user_id_from_api_key("super-secret"));
    }

    #[tokio::test]
    async fn jwt_accepts_valid_token() {
        let verifier = JwtVerifier::new(SECRET, 0);
        let user = verifier.verify(&token("user-42", 3600, SECRET)).await.unwrap();
        assert_eq!(user.as_str(), "user-42");
    }

    #[tokio::test]
    async fn jwt_rejects_expired_and_forged_tokens() {
        let verifier = JwtVerifier::new(SECRET, 0);

        assert!(matches!(
            verifier.verify(&token("u", -3600, SECRET)).await,
            Err(OraculoError::Unauthenticated(_))
        ));
        assert!(matches!(
            verifier.verify(&token("u", 3600, "other-secret")).await,
            Err(OraculoError::Unauthenticated(_))
        ));
        assert!(matches!(
            verifier.verify("not-a-jwt").await,
            Err(OraculoError::Unauthenticated(_))
        ));
    }

    #[tokio::test]
    async fn jwt_rejects_blank_subject() {
        let verifier = JwtVerifier::new(SECRET, 0);
        assert!(verifier.verify(&token("  ", 3600, SECRET)).await.is_err());
    }

    #[tokio::test]
    async fn chain_accepts_either_scheme() {
        let config = AuthConfig {
            api_keys: vec!["carol=static-key".to_string()],
            jwt_secret: Some(SECRET.to_string()),
            jwt_leeway_secs: 0,
        };
        let verifier = verifier_from_config(&config);

        assert_eq!(
            verifier.verify("static-key").await.unwrap().as_str(),
            "carol"
        );
        assert_eq!(
            verifier
                .verify(&token("dave", 60, SECRET))
                .await
                .unwrap()
                .as_str(),
            "dave"
        );
        assert!(verifier.verify("nope").await.is_err());
    }

    #[tokio::test]
    async fn empty_chain_rejects_everything() {
        let verifier = ChainVerifier::new(Vec::new());
        assert!(verifier.is_empty());
        assert!(matches!(
            verifier.verify("anything").await,
            Err(OraculoError::Unauthenticated(_))
        ));
    }
}
