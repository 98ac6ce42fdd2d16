pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod health;
pub mod identity;
pub mod middleware;
pub mod ports;
pub mod services;
pub mod sheets;
pub mod startup;
pub mod validation;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::ports::IdentityProvider;
use crate::services::PaymentService;

/// Display names of the two people sharing expenses.
#[derive(Debug, Clone)]
pub struct PersonLabels {
    pub person_a: String,
    pub person_b: String,
}

#[derive(Clone)]
pub struct AppState {
    pub payments: PaymentService,
    pub identity: Arc<dyn IdentityProvider>,
    pub people: PersonLabels,
}

pub fn create_app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .route("/payments/summary", get(handlers::payments::summary))
        .route(
            "/payments/items",
            get(handlers::payments::list_items).post(handlers::payments::create_item),
        )
        .route(
            "/payments/items/:id",
            get(handlers::payments::get_item)
                .put(handlers::payments::update_item)
                .delete(handlers::payments::delete_item),
        )
        .route(
            "/payments/items/:id/installments/pay",
            put(handlers::payments::mark_installment_paid),
        )
        .route("/payments/items/:id/pay", post(handlers::payments::pay))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_identity,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .merge(protected)
        .layer(axum_middleware::from_fn(
            middleware::request_logger_middleware,
        ))
        .with_state(state)
}
