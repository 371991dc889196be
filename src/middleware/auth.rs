//! Bearer-token identity for the per-user endpoints.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::auth::{self as auth_service, ACCESS_TOKEN};
use crate::AppState;

/// The signed-in user. Every income, expense, budget, dashboard and report
/// handler takes this and scopes its queries to `id`:
/// ```ignore
/// async fn handler(user: CurrentUser) -> impl IntoResponse { ... }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let claims = auth_service::validate_token(token, &state.config.jwt_secret)?;

        // Refresh tokens only buy a new pair at /auth/refresh.
        if claims.token_type != ACCESS_TOKEN {
            return Err(AppError::Unauthorized);
        }

        Ok(CurrentUser {
            id: claims.user_id.parse().map_err(|_| AppError::Unauthorized)?,
            username: claims.sub,
        })
    }
}

/// Token from an `Authorization: Bearer <token>` header. The scheme is
/// matched case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
