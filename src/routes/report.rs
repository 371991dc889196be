//! Report route: monthly PDF download.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};

use crate::errors::AppError;
use crate::middleware::auth::CurrentUser;
use crate::middleware::extract::QueryParams;
use crate::models::month::MonthQuery;
use crate::routes::today;
use crate::services::report;
use crate::AppState;

/// GET /api/v1/report/pdf: PDF report for `?month=&year=` as an attachment.
pub async fn pdf(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(month): QueryParams<MonthQuery>,
) -> Result<impl IntoResponse, AppError> {
    let report = report::monthly_report(&state.db, user.id, month, today()).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", report.filename),
            ),
        ],
        report.bytes,
    ))
}
