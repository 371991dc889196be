use std::env;
use std::str::FromStr;

/// Why configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_access_token_expiry_secs: i64,
    pub jwt_refresh_token_expiry_secs: i64,
    /// Allowed CORS origin.
    pub frontend_url: String,
    /// Brevo transactional mail key. OTP mails are only logged when unset.
    pub brevo_api_key: Option<String>,
    pub email_from: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(lookup);

        Ok(Self {
            database_url: vars.required("DATABASE_URL")?,
            database_max_connections: vars.parsed("DATABASE_MAX_CONNECTIONS", 10)?,
            host: vars.or("BACKEND_HOST", "0.0.0.0"),
            port: vars.parsed("BACKEND_PORT", 5000)?,
            jwt_secret: vars.required("JWT_SECRET")?,
            jwt_access_token_expiry_secs: vars.parsed("JWT_ACCESS_TOKEN_EXPIRY_SECS", 900)?,
            jwt_refresh_token_expiry_secs: vars.parsed("JWT_REFRESH_TOKEN_EXPIRY_SECS", 604_800)?,
            frontend_url: vars.or("FRONTEND_URL", "http://localhost:5173"),
            brevo_api_key: vars.get("BREVO_API_KEY"),
            email_from: vars.or("EMAIL_FROM", "no-reply@fintrack.local"),
        })
    }
}

struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing(key))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { key, value }),
        }
    }
}
