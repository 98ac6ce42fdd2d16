//! Firebase ID-token verification against Google's published signing keys.

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::IdentityClaims;
use crate::ports::{AuthError, Identity, IdentityProvider};

pub const GOOGLE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const JWKS_TTL: Duration = Duration::from_secs(3600);

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

#[derive(Clone)]
pub struct FirebaseVerifier {
    client: Client,
    project_id: String,
    jwks_url: String,
    cache: Arc<RwLock<Option<CachedKeys>>>,
}

impl FirebaseVerifier {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self::with_jwks_url(project_id, GOOGLE_JWKS_URL)
    }

    pub fn with_jwks_url(project_id: impl Into<String>, jwks_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            project_id: project_id.into(),
            jwks_url: jwks_url.into(),
            cache: Arc::new(RwLock::new(None)),
        }
    }

    fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    async fn fetch_keys(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(format!("cannot fetch signing keys: {}", e)))?;

        if !response.status().is_success() {
            return Err(AuthError::Unavailable(format!(
                "signing key endpoint returned {}",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::Unavailable(format!("invalid signing keys: {}", e)))
    }

    /// Decoding key for `kid`, refetching the key set when it is stale or
    /// does not know `kid` (keys rotate).
    async fn key_for(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.fetched_at.elapsed() < JWKS_TTL {
                if let Some(jwk) = cached.keys.find(kid) {
                    return to_decoding_key(jwk);
                }
            }
        }

        let keys = self.fetch_keys().await?;
        tracing::debug!(keys = keys.keys.len(), "Refreshed Firebase signing keys");
        let key = keys.find(kid).map(to_decoding_key);

        *self.cache.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });

        key.unwrap_or_else(|| Err(AuthError::Unauthorized(format!("unknown signing key '{}'", kid))))
    }
}

fn to_decoding_key(jwk: &jsonwebtoken::jwk::Jwk) -> Result<DecodingKey, AuthError> {
    DecodingKey::from_jwk(jwk)
        .map_err(|e| AuthError::Unavailable(format!("unusable signing key: {}", e)))
}

#[async_trait]
impl IdentityProvider for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let header = decode_header(token)
            .map_err(|e| AuthError::Unauthorized(format!("invalid token: {}", e)))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::Unauthorized(format!(
                "unexpected token algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::Unauthorized("token has no key id".to_string()))?;

        let key = self.key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[self.issuer()]);

        let data = decode::<IdentityClaims>(token, &key, &validation)
            .map_err(|e| AuthError::Unauthorized(format!("invalid token: {}", e)))?;
        if data.claims.sub.is_empty() {
            return Err(AuthError::Unauthorized("token has no subject".to_string()));
        }

        Ok(data.claims.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

    fn unsigned_token(kid: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(format!(r#"{{"alg":"RS256","typ":"JWT","kid":"{}"}}"#, kid));
        let payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"user-1","exp":4102444800}"#);
        format!("{}.{}.c2lnbmF0dXJl", header, payload)
    }

    #[test]
    fn issuer_follows_project() {
        let verifier = FirebaseVerifier::new("household-app");
        assert_eq!(verifier.issuer(), "https://securetoken.google.com/household-app");
    }

    #[tokio::test]
    async fn rejects_garbage_without_fetching_keys() {
        let verifier = FirebaseVerifier::with_jwks_url("household-app", "http://127.0.0.1:9/keys");
        assert!(matches!(
            verifier.verify("garbage").await,
            Err(AuthError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn unknown_key_id_is_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/keys")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"keys":[]}"#)
            .create_async()
            .await;

        let verifier =
            FirebaseVerifier::with_jwks_url("household-app", format!("{}/keys", server.url()));
        assert!(matches!(
            verifier.verify(&unsigned_token("k1")).await,
            Err(AuthError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn key_endpoint_failure_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/keys")
            .with_status(503)
            .create_async()
            .await;

        let verifier =
            FirebaseVerifier::with_jwks_url("household-app", format!("{}/keys", server.url()));
        assert!(matches!(
            verifier.verify(&unsigned_token("k1")).await,
            Err(AuthError::Unavailable(_))
        ));
    }
}
