//! Refund desk configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `REFUND_GATEWAY_URL` - Base URL of the refund gateway
//!
//! ## Optional
//! - `REFUND_GATEWAY_TOKEN` - Bearer token sent to the gateway (high entropy)
//! - `REFUND_GATEWAY_TIMEOUT_SECS` - Request timeout (default: 30)
//! - `SHOP_CURRENCY` - ISO 4217 shop currency (default: AUD)
//! - `REFUND_DEFAULT_NOTE` - Note used when none is entered (default: Refund via app)
//! - `SHOP_DEFAULT_LOCATION_ID` - Location used when an order has none (default: 70116966605)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Sentry error sample rate (default: 1.0)

use std::collections::HashMap;
use std::time::Duration;

use refund_desk_core::{CurrencyCode, LocationId};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_NOTE: &str = "Refund via app";
const DEFAULT_LOCATION_ID: &str = "70116966605";
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
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

/// Full refund desk configuration.
#[derive(Debug, Clone)]
pub struct RefundDeskConfig {
    pub gateway: GatewayConfig,
    pub shop: ShopSettings,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
}

/// Refund gateway connection settings.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Base URL, always ending in `/`.
    pub base_url: Url,
    pub token: Option<SecretString>,
    pub timeout: Duration,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Per-shop values that are fixed rather than computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopSettings {
    pub currency: CurrencyCode,
    /// Note sent when the operator leaves it empty.
    pub default_note: String,
    /// Location used when an order's transaction has none.
    pub default_location_id: LocationId,
}

impl Default for ShopSettings {
    fn default() -> Self {
        Self {
            currency: CurrencyCode::default(),
            default_note: DEFAULT_NOTE.to_string(),
            default_location_id: LocationId::new(DEFAULT_LOCATION_ID),
        }
    }
}

impl ShopSettings {
    /// Load only the shop settings; the gateway variables are not needed.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` for an unknown `SHOP_CURRENCY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load shop settings from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ShopSettings::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Self::read(&Env(&lookup))
    }

    fn read<F: Fn(&str) -> Option<String>>(env: &Env<'_, F>) -> Result<Self, ConfigError> {
        Ok(Self {
            currency: env.parsed_or("SHOP_CURRENCY", CurrencyCode::default())?,
            default_note: env.or_default("REFUND_DEFAULT_NOTE", DEFAULT_NOTE),
            default_location_id: LocationId::new(
                env.or_default("SHOP_DEFAULT_LOCATION_ID", DEFAULT_LOCATION_ID),
            ),
        })
    }
}

impl RefundDeskConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the gateway token fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`RefundDeskConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let gateway = GatewayConfig {
            base_url: parse_base_url(&env.required("REFUND_GATEWAY_URL")?)?,
            token: env
                .optional("REFUND_GATEWAY_TOKEN")
                .map(|token| {
                    validate_secret_strength(&token, "REFUND_GATEWAY_TOKEN")?;
                    Ok(SecretString::from(token))
                })
                .transpose()?,
            timeout: Duration::from_secs(env.parsed_or(
                "REFUND_GATEWAY_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
        };

        let shop = ShopSettings::read(&env)?;

        let sentry_sample_rate = env
            .optional("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            gateway,
            shop,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
        })
    }
}

struct Env<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Non-empty value of `key`.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |value| {
            value
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }
}

/// Parse the gateway base URL so that relative endpoints join beneath it.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar("REFUND_GATEWAY_URL".to_string(), reason);

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
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

    #[allow(clippy::cast_precision_loss)] // token lengths are tiny
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject placeholder or low-entropy secrets.
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

impl GatewayConfig {
    /// Whether requests carry a bearer token.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token
            .as_ref()
            .is_some_and(|token| !token.expose_secret().is_empty())
    }
}
