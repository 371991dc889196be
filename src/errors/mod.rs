//! Error type shared by services and handlers, and the `{data, error}` envelope
//! every endpoint answers with.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Error detail in the API response envelope.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: &'static str,
    pub message: String,
    /// Underlying storage or internal error text, for server-side failures only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// JSON envelope: exactly one of `data` and `error` is set.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            data: Some(data),
            error: None,
        })
    }
}

/// Failures a request can end in. Each maps to one HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input, including a month outside 1..=12.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    /// Valid request the caller may not perform: another user's record, a
    /// past month, an unverified account.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for the envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Client-facing message. Server-side failures get a generic one and
    /// carry the cause in [`AppError::detail`].
    fn public_message(&self) -> String {
        match self {
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Forbidden(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::Unauthorized => "Authentication required".to_string(),
            Self::Database(_) | Self::Internal(_) => "Server error".to_string(),
        }
    }

    /// Underlying error text of a storage or internal failure.
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Database(e) => Some(e.to_string()),
            Self::Internal(msg) => Some(msg.clone()),
            _ => None,
        }
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }
}

impl From<validator::ValidationErrors> for AppError {
    /// Flatten field errors into `field: message` pairs, sorted by field.
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut parts: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => format!("{field}: {msg}"),
                    None => format!("{field}: invalid ({})", e.code),
                })
            })
            .collect();
        parts.sort();
        AppError::Validation(parts.join("; "))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            Self::Database(e) => tracing::error!(error = %e, "Database error"),
            Self::Internal(msg) => tracing::error!(error = %msg, "Internal error"),
            _ => tracing::debug!(code = self.code(), error = %self, "Request rejected"),
        }

        let body = ApiResponse::<()> {
            data: None,
            error: Some(ApiError {
                code: self.code(),
                message: self.public_message(),
                detail: self.detail(),
            }),
        };

        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    async fn envelope(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[test]
    fn success_envelope_has_no_error() {
        let response = ApiResponse::success(vec![1, 2, 3]);
        let json = serde_json::to_value(&response.0).unwrap();
        assert_eq!(json["data"], serde_json::json!([1, 2, 3]));
        assert!(json["error"].is_null());
    }

    #[test]
    fn display_carries_detail() {
        let err = AppError::Validation("month must be between 1 and 12".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: month must be between 1 and 12"
        );
    }

    #[test]
    fn sqlx_errors_become_database_errors() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::Database(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_errors_name_the_field() {
        #[derive(Validate)]
        struct Input {
            #[validate(length(min = 1, message = "category is required"))]
            category: String,
        }

        let err: AppError = Input {
            category: String::new(),
        }
        .validate()
        .unwrap_err()
        .into();

        assert_eq!(err.to_string(), "Validation error: category: category is required");
    }

    #[tokio::test]
    async fn forbidden_maps_to_403_envelope() {
        let (status, json) = envelope(AppError::Forbidden(
            "You can only edit current month expenses".to_string(),
        ))
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"]["code"], "FORBIDDEN");
        assert_eq!(
            json["error"]["message"],
            "You can only edit current month expenses"
        );
        assert!(json["data"].is_null());
    }

    #[tokio::test]
    async fn database_error_carries_underlying_detail() {
        let (status, json) = envelope(AppError::Database(sqlx::Error::PoolTimedOut)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(json["error"]["message"], "Server error");
        assert_eq!(
            json["error"]["detail"],
            sqlx::Error::PoolTimedOut.to_string()
        );
    }

    #[tokio::test]
    async fn client_errors_have_no_detail() {
        let (_, json) = envelope(AppError::NotFound("Budget not found".to_string())).await;
        assert!(json["error"].get("detail").is_none());
    }

    #[tokio::test]
    async fn unauthorized_has_fixed_message() {
        let (status, json) = envelope(AppError::Unauthorized).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["message"], "Authentication required");
    }
}
