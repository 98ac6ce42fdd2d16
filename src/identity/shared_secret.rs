use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::IdentityClaims;
use crate::ports::{AuthError, Identity, IdentityProvider};

/// HS256 tokens signed with a secret shared between issuer and service.
/// Used for local development and tests.
#[derive(Clone)]
pub struct SharedSecretVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SharedSecretVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issues a token for `subject` valid for `ttl`.
    pub fn issue(
        &self,
        subject: &str,
        email: Option<&str>,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = IdentityClaims {
            sub: subject.to_string(),
            email: email.map(str::to_string),
            email_verified: email.is_some(),
            name: None,
            picture: None,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Unavailable(format!("cannot sign token: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for SharedSecretVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<IdentityClaims>(token, &self.decoding_key, &validation)
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

    #[tokio::test]
    async fn verifies_issued_tokens() {
        let verifier = SharedSecretVerifier::new("test-secret");
        let token = verifier
            .issue("user-1", Some("ana@example.com"), Duration::hours(1))
            .unwrap();

        let identity = verifier.verify(&token).await.unwrap();
        assert_eq!(identity.subject_id, "user-1");
        assert_eq!(identity.email.as_deref(), Some("ana@example.com"));
        assert!(identity.email_verified);
    }

    #[tokio::test]
    async fn rejects_foreign_and_expired_tokens() {
        let verifier = SharedSecretVerifier::new("test-secret");
        let other = SharedSecretVerifier::new("other-secret");

        let foreign = other.issue("user-1", None, Duration::hours(1)).unwrap();
        assert!(matches!(
            verifier.verify(&foreign).await,
            Err(AuthError::Unauthorized(_))
        ));

        let expired = verifier.issue("user-1", None, Duration::hours(-2)).unwrap();
        assert!(matches!(
            verifier.verify(&expired).await,
            Err(AuthError::Unauthorized(_))
        ));

        assert!(matches!(
            verifier.verify("not-a-jwt").await,
            Err(AuthError::Unauthorized(_))
        ));
    }
}
