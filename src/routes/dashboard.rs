//! Dashboard route: monthly totals, chart series, and advice.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::middleware::extract::QueryParams;
use crate::models::month::MonthQuery;
use crate::models::query::blank_as_none;
use crate::routes::today;
use crate::services::dashboard::{self, DashboardData};
use crate::AppState;

/// Presentation options for the dashboard feed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardView {
    /// Keep only the N most recent transactions in the feed.
    #[serde(default, deserialize_with = "blank_as_none")]
    pub limit: Option<usize>,
}

/// GET /api/v1/dashboard: aggregated data for `?month=&year=` (defaults to now).
pub async fn get(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(month): QueryParams<MonthQuery>,
    QueryParams(view): QueryParams<DashboardView>,
) -> Result<Json<ApiResponse<DashboardData>>, AppError> {
    let mut data = dashboard::get_dashboard(&state.db, user.id, month, today()).await?;
    if let Some(limit) = view.limit {
        data.summary.recent_transactions.truncate(limit);
    }
    Ok(ApiResponse::success(data))
}
