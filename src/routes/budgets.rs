//! Budget routes: yearly and full listings with usage, create, and amount edits.

use axum::{extract::State, Json};
use uuid::Uuid;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::middleware::extract::{JsonBody, PathParams};
use crate::models::budget::{BudgetUsage, CreateBudget, UpdateBudget};
use crate::routes::today;
use crate::services::budget as budget_service;
use crate::AppState;

/// GET /api/v1/budgets: every budget of the current user with usage.
pub async fn list_all(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<BudgetUsage>>>, AppError> {
    let result = budget_service::list_all(&state.db, user.id, today()).await?;
    Ok(ApiResponse::success(result))
}

/// GET /api/v1/budgets/year/{year}: budgets of one year.
pub async fn list_for_year(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(year): PathParams<i32>,
) -> Result<Json<ApiResponse<Vec<BudgetUsage>>>, AppError> {
    let result = budget_service::list_for_year(&state.db, user.id, year, today()).await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/v1/budgets: add a budget for the current or a future month.
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(body): JsonBody<CreateBudget>,
) -> Result<Json<ApiResponse<BudgetUsage>>, AppError> {
    let result = budget_service::create(&state.db, user.id, &body, today()).await?;
    Ok(ApiResponse::success(result))
}

/// PUT /api/v1/budgets/{id}: change a budget's amount.
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    PathParams(id): PathParams<Uuid>,
    JsonBody(body): JsonBody<UpdateBudget>,
) -> Result<Json<ApiResponse<BudgetUsage>>, AppError> {
    let result = budget_service::update(&state.db, user.id, id, body.amount, today()).await?;
    Ok(ApiResponse::success(result))
}
