use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{BillingMonth, ExpenseRecord, Summary};
use crate::error::AppError;
use crate::services::{CreateItemRequest, PaymentMarked, UpdateItemRequest};
use crate::validation::StrictPayload;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub month: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PayQuery {
    pub month: String,
    pub person: String,
}

#[derive(Debug, Deserialize)]
pub struct PayRequest {
    pub month: String,
    pub person: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub hard: bool,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub person_a: String,
    pub person_b: String,
    #[serde(flatten)]
    pub summary: Summary,
}

pub async fn summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>, AppError> {
    let month = match query.month.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<BillingMonth>()?),
    };

    let summary = state.payments.summary(month).await?;
    Ok(Json(SummaryResponse {
        person_a: state.people.person_a.clone(),
        person_b: state.people.person_b.clone(),
        summary,
    }))
}

pub async fn list_items(
    State(state): State<AppState>,
) -> Result<Json<Vec<ExpenseRecord>>, AppError> {
    Ok(Json(state.payments.list_items().await?))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExpenseRecord>, AppError> {
    Ok(Json(state.payments.get_item(&id).await?))
}

pub async fn create_item(
    State(state): State<AppState>,
    Json(payload): Json<StrictPayload<CreateItemRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let record = state.payments.create_item(payload.data).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<StrictPayload<UpdateItemRequest>>,
) -> Result<Json<ExpenseRecord>, AppError> {
    Ok(Json(state.payments.update_item(&id, payload.data).await?))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<impl IntoResponse, AppError> {
    state.payments.delete_item(&id, query.hard).await?;
    Ok(Json(json!({
        "message": format!("payment item {} removed", id),
        "hard": query.hard,
    })))
}

pub async fn mark_installment_paid(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PayQuery>,
) -> Result<Json<PaymentMarked>, AppError> {
    let marked = state
        .payments
        .mark_installment_paid(&id, &query.month, &query.person)
        .await?;
    Ok(Json(marked))
}

pub async fn pay(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<StrictPayload<PayRequest>>,
) -> Result<Json<PaymentMarked>, AppError> {
    let request = payload.data;
    let marked = state
        .payments
        .mark_installment_paid(&id, &request.month, &request.person)
        .await?;
    Ok(Json(marked))
}
