//! OAuth access tokens for the Sheets API.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::SheetsError;

const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before Google says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// The fields of a Google service-account key file that token exchange needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self, SheetsError> {
        serde_json::from_str(raw)
            .map_err(|e| SheetsError::Credentials(format!("invalid service account JSON: {}", e)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SheetsError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SheetsError::Credentials(format!(
                "cannot read service account file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&raw)
    }

    /// Decodes a key passed inline as base64, as container platforms do.
    pub fn from_base64(encoded: &str) -> Result<Self, SheetsError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| SheetsError::Credentials(format!("invalid base64 credentials: {}", e)))?;
        let raw = String::from_utf8(bytes)
            .map_err(|e| SheetsError::Credentials(format!("credentials are not UTF-8: {}", e)))?;
        Self::from_json(&raw)
    }

    /// Signed JWT assertion for the jwt-bearer grant.
    pub fn assertion(&self, issued_at: i64) -> Result<String, SheetsError> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: SPREADSHEETS_SCOPE,
            aud: &self.token_uri,
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| SheetsError::Credentials(format!("invalid private key: {}", e)))?;

        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| SheetsError::Credentials(format!("cannot sign assertion: {}", e)))
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Where access tokens come from.
#[derive(Clone)]
pub enum TokenSource {
    ServiceAccount(ServiceAccountKey),
    /// A pre-issued token, for tests and proxies that handle auth.
    Static(String),
}

/// Hands out access tokens, exchanging the service-account assertion only
/// when the cached token is missing or about to expire.
#[derive(Clone)]
pub struct AccessTokenProvider {
    source: TokenSource,
    cache: Arc<RwLock<Option<CachedToken>>>,
}

impl AccessTokenProvider {
    pub fn new(source: TokenSource) -> Self {
        Self {
            source,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn token(&self, http: &Client) -> Result<String, SheetsError> {
        let key = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::ServiceAccount(key) => key,
        };

        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.value.clone());
            }
        }

        let mut cache = self.cache.write().await;
        if let Some(cached) = cache.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.value.clone());
            }
        }

        let assertion = key.assertion(Utc::now().timestamp())?;
        let response = http
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SheetsError::Api { status, body });
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        tracing::debug!(
            client_email = %key.client_email,
            lifetime_secs = lifetime.as_secs(),
            "Obtained Sheets access token"
        );

        *cache = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }
}
