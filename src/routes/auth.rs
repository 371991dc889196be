//! Authentication routes: registration, email verification, password reset, login, profile.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::{ApiResponse, AppError};
use crate::middleware::auth::CurrentUser;
use crate::middleware::extract::JsonBody;
use crate::models::user::{RegisterUser, UpdateProfile, UserResponse};
use crate::services::auth::{self as auth_service, LoginResult, TokenPair, TokenSettings};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: String,
    pub new_password: String,
    pub confirm_new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email address or username.
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

fn token_settings(state: &AppState) -> TokenSettings<'_> {
    TokenSettings {
        secret: &state.config.jwt_secret,
        access_expiry_secs: state.config.jwt_access_token_expiry_secs,
        refresh_expiry_secs: state.config.jwt_refresh_token_expiry_secs,
    }
}

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterUser>,
) -> Result<Json<ApiResponse<&'static str>>, AppError> {
    auth_service::register(&state.db, &state.mailer, &body).await?;
    Ok(ApiResponse::success("OTP sent to email"))
}

/// POST /api/v1/auth/verify-email
pub async fn verify_email(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<VerifyOtpRequest>,
) -> Result<Json<ApiResponse<&'static str>>, AppError> {
    auth_service::verify_email(&state.db, &body.email, &body.otp).await?;
    Ok(ApiResponse::success("Email verified successfully"))
}

/// POST /api/v1/auth/resend-otp
pub async fn resend_otp(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<EmailRequest>,
) -> Result<Json<ApiResponse<&'static str>>, AppError> {
    auth_service::resend_otp(&state.db, &state.mailer, &body.email).await?;
    Ok(ApiResponse::success("OTP resent successfully"))
}

/// POST /api/v1/auth/reset-request
pub async fn reset_request(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ResetRequest>,
) -> Result<Json<ApiResponse<&'static str>>, AppError> {
    auth_service::reset_request(
        &state.db,
        &state.mailer,
        &body.email,
        &body.new_password,
        &body.confirm_new_password,
    )
    .await?;
    Ok(ApiResponse::success("OTP sent to email"))
}

/// POST /api/v1/auth/reset-verify
pub async fn reset_verify(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<VerifyOtpRequest>,
) -> Result<Json<ApiResponse<&'static str>>, AppError> {
    auth_service::reset_verify(&state.db, &body.email, &body.otp).await?;
    Ok(ApiResponse::success("Password reset successfully"))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResult>>, AppError> {
    let result = auth_service::login(
        &state.db,
        body.identifier.trim(),
        &body.password,
        token_settings(&state),
    )
    .await?;

    Ok(ApiResponse::success(result))
}

/// POST /api/v1/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RefreshRequest>,
) -> Result<Json<ApiResponse<TokenPair>>, AppError> {
    let tokens =
        auth_service::refresh_token(&state.db, &body.refresh_token, token_settings(&state))
            .await?;

    Ok(ApiResponse::success(tokens))
}

/// GET /api/v1/auth/profile: current user profile
pub async fn profile(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user = auth_service::find_user_by_id(&state.db, current_user.id).await?;
    Ok(ApiResponse::success(UserResponse::from(user)))
}

/// PUT /api/v1/auth/profile: partial profile update
pub async fn update_profile(
    State(state): State<AppState>,
    current_user: CurrentUser,
    JsonBody(body): JsonBody<UpdateProfile>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let user = auth_service::update_profile(&state.db, current_user.id, &body).await?;
    Ok(ApiResponse::success(UserResponse::from(user)))
}
