//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `BASE_URL` - Public URL the API is served from
//! - `SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 3000)
//! - `POS_API_TOKEN` / `POS_MERCHANT_ID` - POS credentials (set both or neither)
//! - `POS_ENVIRONMENT` - `sandbox` or `production` (default: sandbox)
//! - `POS_SYNC_ON_STARTUP` - Run a pull sync when the server starts (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text

use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    /// Public base URL; `https` turns on secure cookies
    pub base_url: String,
    pub session_secret: SecretString,
    /// POS credentials, when the integration is enabled
    pub pos: Option<PosConfig>,
    pub pos_sync_on_startup: bool,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
    pub json_logs: bool,
}

/// Which POS deployment to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PosEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl PosEnvironment {
    /// REST base URL for this environment.
    #[must_use]
    pub const fn base_url(self) -> &'static str {
        match self {
            Self::Sandbox => "https://sandbox.dev.clover.com",
            Self::Production => "https://api.clover.com",
        }
    }
}

impl FromStr for PosEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("expected sandbox or production, got {other}")),
        }
    }
}

/// POS REST API credentials.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct PosConfig {
    pub api_token: SecretString,
    pub merchant_id: String,
    pub environment: PosEnvironment,
}

impl fmt::Debug for PosConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PosConfig")
            .field("api_token", &"[REDACTED]")
            .field("merchant_id", &self.merchant_id)
            .field("environment", &self.environment)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = SecretString::from(get_required_env("DATABASE_URL")?);
        let host = get_env_or_default("HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("BASE_URL")?;
        url::Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("BASE_URL".to_string(), e.to_string()))?;

        let session_secret = get_validated_secret("SESSION_SECRET")?;
        validate_session_secret(&session_secret, "SESSION_SECRET")?;

        let pos = PosConfig::from_env()?;
        let pos_sync_on_startup = parse_bool("POS_SYNC_ON_STARTUP")?;

        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            pos,
            pos_sync_on_startup,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
            sentry_traces_sample_rate,
            json_logs: get_optional_env("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl PosConfig {
    /// Load POS credentials on their own, for tools that need no web config.
    ///
    /// Returns `None` when neither credential is set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if only one credential is set or the environment
    /// name is unknown.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let token = get_optional_env("POS_API_TOKEN").filter(|v| !v.is_empty());
        let merchant_id = get_optional_env("POS_MERCHANT_ID").filter(|v| !v.is_empty());

        let (token, merchant_id) = match (token, merchant_id) {
            (None, None) => return Ok(None),
            (Some(token), Some(merchant_id)) => (token, merchant_id),
            (Some(_), None) => return Err(ConfigError::MissingEnvVar("POS_MERCHANT_ID".to_string())),
            (None, Some(_)) => return Err(ConfigError::MissingEnvVar("POS_API_TOKEN".to_string())),
        };

        let environment = get_optional_env("POS_ENVIRONMENT")
            .map(|v| v.parse::<PosEnvironment>())
            .transpose()
            .map_err(|e| ConfigError::InvalidEnvVar("POS_ENVIRONMENT".to_string(), e))?
            .unwrap_or_default();

        Ok(Some(Self {
            api_token: SecretString::from(token),
            merchant_id,
            environment,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(key: &str) -> Result<bool, ConfigError> {
    match get_optional_env(key).as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some("1" | "true" | "TRUE" | "yes") => Ok(true),
        Some("0" | "false" | "FALSE" | "no") => Ok(false),
        Some(other) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got {other}"),
        )),
    }
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject placeholders and low-entropy values.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_bounds() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_placeholder_secret_rejected() {
        let err = validate_secret_strength("changeme-changeme-changeme-1234", "SESSION_SECRET")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_low_entropy_secret_rejected() {
        assert!(validate_secret_strength(&"ab".repeat(20), "SESSION_SECRET").is_err());
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "SESSION_SECRET").is_ok());
    }

    #[test]
    fn test_session_secret_length() {
        assert!(validate_session_secret(&SecretString::from("short"), "SESSION_SECRET").is_err());
        assert!(validate_session_secret(&SecretString::from("k".repeat(32)), "SESSION_SECRET").is_ok());
    }

    #[test]
    fn test_pos_environment_parse() {
        assert_eq!("Sandbox".parse::<PosEnvironment>(), Ok(PosEnvironment::Sandbox));
        assert_eq!("production".parse::<PosEnvironment>(), Ok(PosEnvironment::Production));
        assert!("staging".parse::<PosEnvironment>().is_err());
        assert_eq!(PosEnvironment::Production.base_url(), "https://api.clover.com");
    }

    #[test]
    fn test_pos_config_debug_redacts_token() {
        let config = PosConfig {
            api_token: SecretString::from("tok_live_9f8e7d6c5b4a"),
            merchant_id: "MERCHANT42".to_string(),
            environment: PosEnvironment::Sandbox,
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("MERCHANT42"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("tok_live_9f8e7d6c5b4a"));
    }

    #[test]
    fn test_socket_addr_and_secure_cookies() {
        let config = ApiConfig {
            database_url: SecretString::from("postgres://localhost/shop"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "https://shop.test".to_string(),
            session_secret: SecretString::from("k".repeat(32)),
            pos: None,
            pos_sync_on_startup: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
            json_logs: false,
        };
        assert_eq!(config.socket_addr().port(), 3000);
        assert!(config.secure_cookies());
    }
}
