//! Route definitions for the fintrack API.

pub mod auth;
pub mod budgets;
pub mod dashboard;
pub mod expenses;
pub mod health;
pub mod incomes;
pub mod report;

use axum::{
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use chrono::{NaiveDate, Utc};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::AppState;

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Calendar date the current-month rules are evaluated against.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let cors = match state.config.frontend_url.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new().allow_origin(origin),
        Err(e) => {
            tracing::warn!(error = %e, "Invalid FRONTEND_URL, allowing any origin");
            CorsLayer::new().allow_origin(Any)
        }
    }
    .allow_methods(Any)
    .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/verify-email", post(auth::verify_email))
        .route("/auth/resend-otp", post(auth::resend_otp))
        .route("/auth/reset-request", post(auth::reset_request))
        .route("/auth/reset-verify", post(auth::reset_verify))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route(
            "/auth/profile",
            get(auth::profile).put(auth::update_profile),
        );

    let record_routes = Router::new()
        .route("/incomes", get(incomes::list).post(incomes::create))
        .route("/incomes/filter", get(incomes::filter))
        .route(
            "/incomes/{id}",
            put(incomes::update).delete(incomes::delete),
        )
        .route("/expenses", get(expenses::list).post(expenses::create))
        .route("/expenses/filter", get(expenses::filter))
        .route(
            "/expenses/{id}",
            put(expenses::update).delete(expenses::delete),
        );

    let budget_routes = Router::new()
        .route("/budgets", get(budgets::list_all).post(budgets::create))
        .route("/budgets/year/{year}", get(budgets::list_for_year))
        .route("/budgets/{id}", put(budgets::update));

    let insight_routes = Router::new()
        .route("/dashboard", get(dashboard::get))
        .route("/report/pdf", get(report::pdf));

    Router::new()
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready))
        .nest(
            "/api/v1",
            auth_routes
                .merge(record_routes)
                .merge(budget_routes)
                .merge(insight_routes),
        )
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
