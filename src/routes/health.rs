//! Liveness and readiness probes, served outside `/api/v1`.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::errors::ApiResponse;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Readiness {
    pub status: &'static str,
    pub database: &'static str,
}

/// The process is up.
pub async fn live() -> &'static str {
    "OK"
}

/// Ready once PostgreSQL answers, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<Readiness>>) {
    match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            ApiResponse::success(Readiness {
                status: "ok",
                database: "connected",
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiResponse::success(Readiness {
                    status: "unavailable",
                    database: "unreachable",
                }),
            )
        }
    }
}
