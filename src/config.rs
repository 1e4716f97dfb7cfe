//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup. A missing or too-short signing key
//! stops the server before it accepts any request.

use std::env;

/// Minimum length of the JWT signing key, in bytes.
pub const MIN_SIGNING_KEY_LEN: usize = 32;

/// Longest accepted login session (one year).
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// GCP project holding the Firestore database.
    /// `None` selects the in-memory store (local development).
    pub gcp_project_id: Option<String>,
    /// JWT signing key for session cookies (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Lifetime of a login session
    pub session_ttl_hours: i64,
    /// PBKDF2 rounds used for newly derived session keys
    pub kdf_iterations: u32,
    /// Replaces the per-environment ESO API base URL (e.g. for a local stub)
    pub eso_api_url: Option<String>,
    /// Timeout for each ESO API request
    pub eso_api_timeout_secs: u64,
    /// Set the `Secure` attribute on session cookies
    pub secure_cookies: bool,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            gcp_project_id: None,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!!".to_vec(),
            session_ttl_hours: 12,
            kdf_iterations: 1_000,
            eso_api_url: None,
            eso_api_timeout_secs: 5,
            secure_cookies: false,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let jwt_signing_key = env::var("JWT_SIGNING_KEY")
            .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
            .trim()
            .as_bytes()
            .to_vec();
        if jwt_signing_key.len() < MIN_SIGNING_KEY_LEN {
            return Err(ConfigError::Invalid {
                name: "JWT_SIGNING_KEY",
                reason: format!("must be at least {} bytes", MIN_SIGNING_KEY_LEN),
            });
        }

        let session_ttl_hours: i64 = parse_var("SESSION_TTL_HOURS", 12)?;
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&session_ttl_hours) {
            return Err(ConfigError::Invalid {
                name: "SESSION_TTL_HOURS",
                reason: format!("must be between 1 and {}", MAX_SESSION_TTL_HOURS),
            });
        }

        Ok(Self {
            port: parse_var("PORT", 8080)?,
            gcp_project_id: env::var("GCP_PROJECT_ID")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            jwt_signing_key,
            session_ttl_hours,
            kdf_iterations: parse_var("KDF_ITERATIONS", 210_000)?,
            eso_api_url: env::var("ESO_API_URL")
                .ok()
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty()),
            eso_api_timeout_secs: parse_var("ESO_API_TIMEOUT_SECS", 30)?,
            secure_cookies: parse_var("SECURE_COOKIES", true)?,
        })
    }
}

/// Read an optional variable, falling back to `default` when unset.
fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            reason: format!("cannot parse {:?}", raw),
        }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
