pub mod auth;
pub mod payments;

use crate::health::{check_health, DependencyChecker, RecordStoreChecker};
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let store = RecordStoreChecker::new(state.payments.store());
    let health = check_health(&[("record_store", &store as &dyn DependencyChecker)]).await;

    // 503 when the record store cannot be read
    let status_code = if health.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health))
}
