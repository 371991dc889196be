//! Income routes: list, filter, and current-month create/update/delete.

use axum::{extract::State, Json};
use uuid::Uuid;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::middleware::extract::{JsonBody, PathParams, QueryParams};
use crate::models::transaction::{
    CreateTransaction, Transaction, TransactionFilters, TransactionKind, UpdateTransaction,
};
use crate::routes::today;
use crate::services::transaction as transaction_service;
use crate::AppState;

const KIND: TransactionKind = TransactionKind::Income;

/// GET /api/v1/incomes: all incomes of the current user, newest first.
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<Transaction>>>, AppError> {
    let rows = transaction_service::list(&state.db, KIND, user.id).await?;
    Ok(ApiResponse::success(rows))
}

/// GET /api/v1/incomes/filter: filter by category and/or exact date.
pub async fn filter(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(filters): QueryParams<TransactionFilters>,
) -> Result<Json<ApiResponse<Vec<Transaction>>>, AppError> {
    let rows = transaction_service::filter(&state.db, KIND, user.id, &filters).await?;
    Ok(ApiResponse::success(rows))
}

/// POST /api/v1/incomes: record an income dated in the current month.
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody<CreateTransaction>,
) -> Result<Json<ApiResponse<Transaction>>, AppError> {
    let record = transaction_service::create(&state.db, KIND, user.id, &body, today()).await?;
    Ok(ApiResponse::success(record))
}

/// PUT /api/v1/incomes/{id}: edit a current-month income.
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(id): PathParams<Uuid>,
    JsonBody(body): JsonBody<UpdateTransaction>,
) -> Result<Json<ApiResponse<Transaction>>, AppError> {
    let record =
        transaction_service::update(&state.db, KIND, user.id, id, &body, today()).await?;
    Ok(ApiResponse::success(record))
}

/// DELETE /api/v1/incomes/{id}: delete a current-month income.
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(id): PathParams<Uuid>,
) -> Result<Json<ApiResponse<&'static str>>, AppError> {
    transaction_service::delete(&state.db, KIND, user.id, id, today()).await?;
    Ok(ApiResponse::success("Income deleted successfully"))
}
