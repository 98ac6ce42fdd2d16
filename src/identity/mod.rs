//! Bearer-token verifiers implementing [`crate::ports::IdentityProvider`].

pub mod firebase;
pub mod shared_secret;

pub use firebase::FirebaseVerifier;
pub use shared_secret::SharedSecretVerifier;

use serde::{Deserialize, Serialize};

use crate::ports::Identity;

/// Claims both verifiers understand. Firebase ID tokens carry more, which
/// are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

impl From<IdentityClaims> for Identity {
    fn from(claims: IdentityClaims) -> Self {
        Identity {
            subject_id: claims.sub,
            email: claims.email,
            email_verified: claims.email_verified,
            display_name: claims.name,
            picture: claims.picture,
        }
    }
}
