use axum::{Extension, Json};

use crate::ports::Identity;

/// The identity resolved from the caller's bearer token.
pub async fn me(Extension(identity): Extension<Identity>) -> Json<Identity> {
    Json(identity)
}
