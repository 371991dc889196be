//! Authentication service: password hashing, OTP verification, JWT, and account management.

use argon2::{
    password_hash::{
        rand_core::{OsRng, RngCore},
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::models::user::{RegisterUser, UpdateProfile, User, UserResponse};
use crate::services::mailer::Mailer;

/// `token_type` claim of tokens accepted on API requests.
pub const ACCESS_TOKEN: &str = "access";
/// `token_type` claim of tokens accepted only by the refresh endpoint.
pub const REFRESH_TOKEN: &str = "refresh";

/// JWT claims embedded in access and refresh tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub user_id: String,
    pub token_type: String,
    pub exp: i64,
    pub iat: i64,
}

/// Token pair returned on successful login.
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Login result: tokens plus the profile the client shows.
#[derive(Debug, Serialize)]
pub struct LoginResult {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: UserResponse,
}

/// Token lifetimes and signing secret, copied out of the app config.
#[derive(Debug, Clone, Copy)]
pub struct TokenSettings<'a> {
    pub secret: &'a str,
    pub access_expiry_secs: i64,
    pub refresh_expiry_secs: i64,
}

/// Hash a plaintext password with argon2id.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {e}")))
}

/// Verify a plaintext password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Six-digit one-time code in 100000..=999999.
pub fn generate_otp() -> String {
    (100_000 + OsRng.next_u32() % 900_000).to_string()
}

/// Generate a JWT token pair (access + refresh).
pub fn generate_tokens(user: &User, settings: TokenSettings<'_>) -> Result<TokenPair, AppError> {
    let now = Utc::now();
    let encoding_key = EncodingKey::from_secret(settings.secret.as_bytes());

    let access_claims = Claims {
        sub: user.username.clone(),
        user_id: user.id.to_string(),
        token_type: ACCESS_TOKEN.to_string(),
        exp: (now + Duration::seconds(settings.access_expiry_secs)).timestamp(),
        iat: now.timestamp(),
    };

    let refresh_claims = Claims {
        token_type: REFRESH_TOKEN.to_string(),
        exp: (now + Duration::seconds(settings.refresh_expiry_secs)).timestamp(),
        ..access_claims.clone()
    };

    let access_token = jsonwebtoken::encode(&Header::default(), &access_claims, &encoding_key)
        .map_err(|e| AppError::Internal(format!("Token generation failed: {e}")))?;

    let refresh_token = jsonwebtoken::encode(&Header::default(), &refresh_claims, &encoding_key)
        .map_err(|e| AppError::Internal(format!("Token generation failed: {e}")))?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: settings.access_expiry_secs,
    })
}

/// Validate a JWT and return the claims.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<Claims, AppError> {
    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let validation = Validation::default();

    jsonwebtoken::decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|_| AppError::Unauthorized)
}

/// Register a new unverified account and mail it a verification code.
///
/// An unverified account holding the same email is replaced; a verified one
/// blocks registration.
pub async fn register(pool: &PgPool, mailer: &Mailer, input: &RegisterUser) -> Result<(), AppError> {
    input.validate()?;
    if input.password != input.confirm_password {
        return Err(AppError::Validation("Passwords do not match".to_string()));
    }

    if let Some(existing) = find_user_by_email(pool, &input.email).await? {
        if existing.verified {
            return Err(AppError::Conflict(
                "Email already in use. Please use another email.".to_string(),
            ));
        }
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(existing.id)
            .execute(pool)
            .await?;
        tracing::info!(user_id = %existing.id, "Replaced unverified registration");
    }

    let taken: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(&input.username)
            .fetch_one(pool)
            .await?;
    if taken {
        return Err(AppError::Conflict(
            "Username already taken. Please choose a different username.".to_string(),
        ));
    }

    let password_hash = hash_password(&input.password)?;
    let otp = generate_otp();
    let otp_hash = hash_password(&otp)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, phone, password_hash, otp_hash, verified)
        VALUES ($1, $2, $3, $4, $5, false)
        RETURNING *
        "#,
    )
    .bind(&input.username)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(&password_hash)
    .bind(&otp_hash)
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict("Username or email already exists".to_string())
        }
        _ => AppError::Database(e),
    })?;

    tracing::info!(user_id = %user.id, "Registered user, sending verification code");
    mailer
        .send(
            &user.email,
            "Your Verification OTP",
            &format!("Your OTP code is {otp}"),
        )
        .await
}

/// Confirm an email address with the mailed code.
pub async fn verify_email(pool: &PgPool, email: &str, otp: &str) -> Result<(), AppError> {
    let user = find_user_by_email(pool, email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    check_otp(otp, user.otp_hash.as_deref())?;

    sqlx::query(
        "UPDATE users SET verified = true, otp_hash = NULL, updated_at = NOW() WHERE id = $1",
    )
    .bind(user.id)
    .execute(pool)
    .await?;

    tracing::info!(user_id = %user.id, "Email verified");
    Ok(())
}

/// Issue and mail a fresh verification code.
pub async fn resend_otp(pool: &PgPool, mailer: &Mailer, email: &str) -> Result<(), AppError> {
    let user = find_user_by_email(pool, email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let otp = generate_otp();
    store_otp(pool, user.id, &hash_password(&otp)?, None).await?;

    mailer
        .send(
            &user.email,
            "Your New Verification OTP",
            &format!("Your new OTP code is {otp}"),
        )
        .await
}

/// Start a password reset: park the new password until the mailed code is confirmed.
pub async fn reset_request(
    pool: &PgPool,
    mailer: &Mailer,
    email: &str,
    new_password: &str,
    confirm_new_password: &str,
) -> Result<(), AppError> {
    if new_password.is_empty() {
        return Err(AppError::Validation("New password is required".to_string()));
    }
    if new_password != confirm_new_password {
        return Err(AppError::Validation("Passwords do not match".to_string()));
    }

    let user = find_user_by_email(pool, email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let otp = generate_otp();
    let pending = hash_password(new_password)?;
    store_otp(pool, user.id, &hash_password(&otp)?, Some(&pending)).await?;

    tracing::info!(user_id = %user.id, "Password reset requested");
    mailer
        .send(
            &user.email,
            "Your Reset Password OTP",
            &format!("Your OTP code is {otp}"),
        )
        .await
}

/// Finish a password reset with the mailed code.
pub async fn reset_verify(pool: &PgPool, email: &str, otp: &str) -> Result<(), AppError> {
    let no_pending = || AppError::Validation("No pending password reset found".to_string());

    let user = find_user_by_email(pool, email)
        .await?
        .filter(|u| u.otp_hash.is_some())
        .ok_or_else(no_pending)?;
    let pending = user.pending_password_hash.clone().ok_or_else(no_pending)?;

    check_otp(otp, user.otp_hash.as_deref())?;

    sqlx::query(
        r#"
        UPDATE users
        SET password_hash = $1, pending_password_hash = NULL, otp_hash = NULL, updated_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(&pending)
    .bind(user.id)
    .execute(pool)
    .await?;

    tracing::info!(user_id = %user.id, "Password reset completed");
    Ok(())
}

/// Authenticate by email (case-insensitive) or username (exact) and issue tokens.
pub async fn login(
    pool: &PgPool,
    identifier: &str,
    password: &str,
    settings: TokenSettings<'_>,
) -> Result<LoginResult, AppError> {
    if identifier.is_empty() || password.is_empty() {
        return Err(AppError::Validation("All fields required".to_string()));
    }

    let user = if identifier.contains('@') {
        find_user_by_email(pool, identifier).await?
    } else {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(identifier)
            .fetch_optional(pool)
            .await?
    }
    .ok_or(AppError::Unauthorized)?;

    if !user.verified {
        return Err(AppError::Forbidden("Email not verified".to_string()));
    }

    if !verify_password(password, &user.password_hash)? {
        tracing::warn!(user_id = %user.id, "Failed login attempt");
        return Err(AppError::Unauthorized);
    }

    let tokens = generate_tokens(&user, settings)?;
    Ok(LoginResult {
        tokens,
        user: UserResponse::from(user),
    })
}

/// Refresh an access token using a valid refresh token.
pub async fn refresh_token(
    pool: &PgPool,
    refresh_token_str: &str,
    settings: TokenSettings<'_>,
) -> Result<TokenPair, AppError> {
    let claims = validate_token(refresh_token_str, settings.secret)?;

    if claims.token_type != REFRESH_TOKEN {
        return Err(AppError::Unauthorized);
    }

    let user_id: Uuid = claims
        .user_id
        .parse()
        .map_err(|_| AppError::Unauthorized)?;

    let user =
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND verified = true")
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::Unauthorized)?;

    generate_tokens(&user, settings)
}

/// Find a user by ID.
pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Find a user by email, ignoring case.
pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email.trim())
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Apply a partial profile update; username and email must stay unique.
pub async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    input: &UpdateProfile,
) -> Result<User, AppError> {
    input.validate()?;

    if let Some(username) = &input.username {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND id <> $2)",
        )
        .bind(username)
        .bind(id)
        .fetch_one(pool)
        .await?;
        if taken {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }
    }

    if let Some(email) = &input.email {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND id <> $2)",
        )
        .bind(email)
        .bind(id)
        .fetch_one(pool)
        .await?;
        if taken {
            return Err(AppError::Conflict("Email already in use".to_string()));
        }
    }

    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET username = COALESCE($1, username),
            email = COALESCE($2, email),
            phone = COALESCE($3, phone),
            updated_at = NOW()
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(&input.username)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

async fn store_otp(
    pool: &PgPool,
    user_id: Uuid,
    otp_hash: &str,
    pending_password_hash: Option<&str>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE users
        SET otp_hash = $1,
            pending_password_hash = COALESCE($2, pending_password_hash),
            updated_at = NOW()
        WHERE id = $3
        "#,
    )
    .bind(otp_hash)
    .bind(pending_password_hash)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

fn check_otp(otp: &str, stored: Option<&str>) -> Result<(), AppError> {
    let matches = match stored {
        Some(hash) => verify_password(otp.trim(), hash)?,
        None => false,
    };
    if matches {
        Ok(())
    } else {
        Err(AppError::Validation("Invalid OTP".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "testuser".to_string(),
            email: "test@example.com".to_string(),
            phone: "555-0100".to_string(),
            password_hash: "hash".to_string(),
            otp_hash: None,
            pending_password_hash: None,
            verified: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn settings(secret: &str, access: i64, refresh: i64) -> TokenSettings<'_> {
        TokenSettings {
            secret,
            access_expiry_secs: access,
            refresh_expiry_secs: refresh,
        }
    }

    #[test]
    fn password_hash_and_verify() {
        let password = "SecurePassword123!";
        let hash = hash_password(password).unwrap();
        assert_ne!(hash, password);
        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("WrongPassword", &hash).unwrap());
    }

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..50 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
            assert!(!otp.starts_with('0'));
        }
    }

    #[test]
    fn otp_check_against_hash() {
        let hash = hash_password("482913").unwrap();
        assert!(check_otp("482913", Some(&hash)).is_ok());
        assert!(check_otp(" 482913 ", Some(&hash)).is_ok());
        assert!(check_otp("000000", Some(&hash)).is_err());
        assert!(check_otp("482913", None).is_err());
    }

    #[test]
    fn token_generation_and_validation() {
        let user = sample_user();
        let secret = "test-secret-key-for-jwt";
        let tokens = generate_tokens(&user, settings(secret, 900, 604800)).unwrap();
        assert_eq!(tokens.token_type, "Bearer");
        assert_eq!(tokens.expires_in, 900);

        let claims = validate_token(&tokens.access_token, secret).unwrap();
        assert_eq!(claims.sub, "testuser");
        assert_eq!(claims.token_type, "access");
        assert_eq!(claims.user_id, user.id.to_string());

        let refresh_claims = validate_token(&tokens.refresh_token, secret).unwrap();
        assert_eq!(refresh_claims.token_type, "refresh");
    }

    #[test]
    fn token_signed_with_other_secret_rejected() {
        let tokens = generate_tokens(&sample_user(), settings("secret-a", 900, 900)).unwrap();
        assert!(validate_token(&tokens.access_token, "secret-b").is_err());
    }

    #[test]
    fn invalid_token_rejected() {
        let result = validate_token("garbage.token.here", "secret");
        assert!(result.is_err());
    }

    #[test]
    fn expired_token_rejected() {
        let secret = "test-secret";
        // Expired well beyond the 60s leeway window
        let tokens = generate_tokens(&sample_user(), settings(secret, -3600, -3600)).unwrap();
        let result = validate_token(&tokens.access_token, secret);
        assert!(result.is_err());
    }
}
