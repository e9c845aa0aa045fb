//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_TOKEN_SECRET` - Authorization token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_SESSION_MAX_IDLE_HOURS` - Idle time before a session is swept (default: 120)
//! - `STOREFRONT_SESSION_SWEEP_INTERVAL_SECS` - Minimum gap between on-demand sweeps (default: 30)
//! - `STOREFRONT_SESSION_SWEEP_PERIOD_SECS` - Periodic sweep cadence (default: 3600)
//! - `STOREFRONT_LOGIN_BACKOFF_SECS` - Backoff added per failed login (default: 2)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use chrono::TimeDelta;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::services::auth::throttle::DEFAULT_BACKOFF_UNIT;
use crate::services::session::JanitorConfig;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Upper bound for the session idle time.
const MAX_IDLE: TimeDelta = TimeDelta::days(366);
/// Upper bound for the sweep interval, sweep period and backoff unit.
const MAX_SHORT_DURATION: TimeDelta = TimeDelta::days(1);

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
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
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

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Authorization token signing secret
    pub token_secret: SecretString,
    /// Session expiry and sweeping
    pub session: JanitorConfig,
    /// Backoff added per consecutive failed login
    pub login_backoff: TimeDelta,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry transaction sample rate
    pub sentry_traces_sample_rate: f32,
}

impl StorefrontConfig {
    /// Configuration with defaults for everything but the URL and secret.
    ///
    /// The secret is not validated; use [`Self::from_env`] for deployments.
    #[must_use]
    pub fn new(base_url: impl Into<String>, token_secret: SecretString) -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            base_url: base_url.into(),
            token_secret,
            session: JanitorConfig::default(),
            login_backoff: DEFAULT_BACKOFF_UNIT,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_parsed_or_default("STOREFRONT_HOST", IpAddr::V4(Ipv4Addr::LOCALHOST))?;
        let port = get_parsed_or_default("STOREFRONT_PORT", 3000_u16)?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let token_secret = get_validated_secret("STOREFRONT_TOKEN_SECRET")?;
        validate_token_secret(&token_secret, "STOREFRONT_TOKEN_SECRET")?;

        let session = JanitorConfig {
            max_idle: get_duration_or_default(
                "STOREFRONT_SESSION_MAX_IDLE_HOURS",
                TimeDelta::hours(120),
                MAX_IDLE,
                TimeDelta::try_hours,
            )?,
            sweep_interval: get_duration_or_default(
                "STOREFRONT_SESSION_SWEEP_INTERVAL_SECS",
                TimeDelta::seconds(30),
                MAX_SHORT_DURATION,
                TimeDelta::try_seconds,
            )?,
            sweep_period: get_duration_or_default(
                "STOREFRONT_SESSION_SWEEP_PERIOD_SECS",
                TimeDelta::hours(1),
                MAX_SHORT_DURATION,
                TimeDelta::try_seconds,
            )?
            .to_std()
            .map_err(|e| {
                ConfigError::InvalidEnvVar(
                    "STOREFRONT_SESSION_SWEEP_PERIOD_SECS".to_string(),
                    e.to_string(),
                )
            })?,
        };
        let login_backoff = get_duration_or_default(
            "STOREFRONT_LOGIN_BACKOFF_SECS",
            DEFAULT_BACKOFF_UNIT,
            MAX_SHORT_DURATION,
            TimeDelta::try_seconds,
        )?;

        Ok(Self {
            host,
            port,
            base_url,
            token_secret,
            session,
            login_backoff,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_parsed_or_default("SENTRY_SAMPLE_RATE", 1.0_f32)?,
            sentry_traces_sample_rate: get_parsed_or_default("SENTRY_TRACES_SAMPLE_RATE", 0.0_f32)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies must carry the `Secure` attribute.
    #[must_use]
    pub fn cookies_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Parse an optional environment variable, falling back to `default` when unset.
fn get_parsed_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| parse_env(key, &raw))
}

fn parse_env<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse an optional whole-number duration, falling back to `default` when unset.
fn get_duration_or_default(
    key: &str,
    default: TimeDelta,
    max: TimeDelta,
    unit: fn(i64) -> Option<TimeDelta>,
) -> Result<TimeDelta, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |raw| parse_duration(key, &raw, max, unit))
}

/// Parse `raw` as a count of `unit`s. The result must lie in `(0, max]`.
fn parse_duration(
    key: &str,
    raw: &str,
    max: TimeDelta,
    unit: fn(i64) -> Option<TimeDelta>,
) -> Result<TimeDelta, ConfigError> {
    let count: i64 = parse_env(key, raw)?;
    unit(count)
        .filter(|d| *d > TimeDelta::zero() && *d <= max)
        .ok_or_else(|| {
            let max = max.num_seconds();
            ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("must be positive and at most {max} seconds (got {count})"),
            )
        })
}

/// Validate that a token secret meets minimum length requirements.
fn validate_token_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_TOKEN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_TOKEN_SECRET_LENGTH,
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

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
