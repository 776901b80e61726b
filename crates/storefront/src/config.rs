//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STRIPE_SECRET_KEY` - Stripe secret (`sk_...`) or restricted (`rk_...`) key
//! - `IGNITE_BASE_URL` - Public URL for the storefront
//!
//! ## Optional
//! - `IGNITE_HOST` - Bind address (default: 127.0.0.1)
//! - `IGNITE_PORT` - Listen port (default: 3000)
//! - `STRIPE_API_BASE` - Stripe API root (default: <https://api.stripe.com/v1>)
//! - `IGNITE_PRERENDER_IDS` - Comma-separated product ids generated at startup
//!   (default: `prod_NdSKKrvk4LDcXT`)
//! - `IGNITE_REVALIDATE_SECS` - Age after which a page is regenerated (default: 3600)
//! - `CHECKOUT_SUCCESS_URL` - Where Stripe sends the buyer after paying
//!   (default: `{base}/success?session_id={CHECKOUT_SESSION_ID}`)
//! - `CHECKOUT_CANCEL_URL` - Where Stripe sends the buyer on cancel (default: `{base}/`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use ignite_shop_core::ProductId;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Product generated eagerly when `IGNITE_PRERENDER_IDS` is unset.
pub const DEFAULT_PRERENDER_ID: &str = "prod_NdSKKrvk4LDcXT";

/// Default revalidation window: one hour.
pub const DEFAULT_REVALIDATE_SECS: u64 = 60 * 60;

const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
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
    /// Public base URL for the storefront, without trailing slash
    pub base_url: String,
    /// Stripe API configuration
    pub stripe: StripeConfig,
    /// Page generation settings
    pub catalog: CatalogConfig,
    /// Hosted checkout redirect targets
    pub checkout: CheckoutConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Stripe API configuration.
///
/// Implements `Debug` manually to redact the secret key.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret or restricted API key (server-side only)
    pub secret_key: SecretString,
    /// API root, e.g. <https://api.stripe.com/v1>
    pub api_base: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Which pages are generated and how long they stay fresh.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Product ids generated at startup
    pub prerender_ids: Vec<ProductId>,
    /// Age after which a generated page is rebuilt
    pub revalidate: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            prerender_ids: vec![ProductId::new(DEFAULT_PRERENDER_ID)],
            revalidate: Duration::from_secs(DEFAULT_REVALIDATE_SECS),
        }
    }
}

/// Redirect targets handed to Stripe when creating a checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Page shown after a successful payment
    pub success_url: String,
    /// Page shown when the buyer abandons checkout
    pub cancel_url: String,
}

impl CheckoutConfig {
    /// Defaults derived from the storefront base URL.
    #[must_use]
    pub fn for_base_url(base_url: &str) -> Self {
        Self {
            success_url: format!("{base_url}/success?session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{base_url}/"),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the Stripe key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("IGNITE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("IGNITE_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("IGNITE_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("IGNITE_PORT".to_string(), e.to_string()))?;
        let base_url = normalize_base_url("IGNITE_BASE_URL", &get_required_env("IGNITE_BASE_URL")?)?;

        let stripe = StripeConfig::from_env()?;
        let catalog = CatalogConfig::from_env()?;

        let defaults = CheckoutConfig::for_base_url(&base_url);
        let checkout = CheckoutConfig {
            success_url: get_optional_env("CHECKOUT_SUCCESS_URL").unwrap_or(defaults.success_url),
            cancel_url: get_optional_env("CHECKOUT_CANCEL_URL").unwrap_or(defaults.cancel_url),
        };

        Ok(Self {
            host,
            port,
            base_url,
            stripe,
            catalog,
            checkout,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl StripeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret_key = get_validated_secret("STRIPE_SECRET_KEY")?;
        validate_stripe_key(&secret_key, "STRIPE_SECRET_KEY")?;

        Ok(Self {
            secret_key,
            api_base: get_env_or_default("STRIPE_API_BASE", DEFAULT_STRIPE_API_BASE)
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

impl CatalogConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let prerender_ids = get_optional_env("IGNITE_PRERENDER_IDS")
            .map_or(defaults.prerender_ids, |raw| parse_id_list(&raw));

        let revalidate = match get_optional_env("IGNITE_REVALIDATE_SECS") {
            Some(raw) => Duration::from_secs(raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidEnvVar("IGNITE_REVALIDATE_SECS".to_string(), e.to_string())
            })?),
            None => defaults.revalidate,
        };

        Ok(Self {
            prerender_ids,
            revalidate,
        })
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
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Split a comma-separated id list, dropping blanks.
fn parse_id_list(raw: &str) -> Vec<ProductId> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ProductId::from)
        .collect()
}

/// Check the base URL parses and strip any trailing slash.
fn normalize_base_url(var_name: &str, raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "must have a host".to_string(),
        ));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

/// Stripe server-side keys are secret (`sk_`) or restricted (`rk_`).
fn validate_stripe_key(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.starts_with("sk_") || value.starts_with("rk_") {
        return Ok(());
    }
    let reason = if value.starts_with("pk_") {
        "is a publishable key; a secret key (sk_...) is required"
    } else {
        "must start with sk_ or rk_"
    };
    Err(ConfigError::InsecureSecret(
        var_name.to_string(),
        reason.to_string(),
    ))
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key from the Stripe dashboard."
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("sk_test_your-key-here", "STRIPE_SECRET_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("sk_aaaaaaaaaaaaaaaaaaaaaaaa", "STRIPE_SECRET_KEY");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength(
            "sk_test_51Mv9qRKa7Zp3XwYtB2nLcD8fGhJ4kE6",
            "STRIPE_SECRET_KEY",
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_stripe_key_prefixes() {
        let ok = SecretString::from("sk_live_abc");
        assert!(validate_stripe_key(&ok, "K").is_ok());

        let restricted = SecretString::from("rk_live_abc");
        assert!(validate_stripe_key(&restricted, "K").is_ok());

        let publishable = SecretString::from("pk_live_abc");
        let err = validate_stripe_key(&publishable, "K").unwrap_err();
        assert!(err.to_string().contains("publishable"));
    }

    #[test]
    fn test_parse_id_list_trims_and_skips_blanks() {
        let ids = parse_id_list(" prod_a, prod_b,,  ,prod_c ");
        assert_eq!(
            ids,
            vec![
                ProductId::new("prod_a"),
                ProductId::new("prod_b"),
                ProductId::new("prod_c")
            ]
        );
    }

    #[test]
    fn test_catalog_defaults() {
        let catalog = CatalogConfig::default();
        assert_eq!(catalog.prerender_ids, vec![ProductId::new(DEFAULT_PRERENDER_ID)]);
        assert_eq!(catalog.revalidate, Duration::from_secs(3600));
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("B", "https://shop.example.com/").unwrap(),
            "https://shop.example.com"
        );
        assert!(normalize_base_url("B", "not a url").is_err());
    }

    #[test]
    fn test_checkout_defaults_follow_base_url() {
        let checkout = CheckoutConfig::for_base_url("https://shop.example.com");
        assert_eq!(
            checkout.success_url,
            "https://shop.example.com/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(checkout.cancel_url, "https://shop.example.com/");
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            stripe: StripeConfig {
                secret_key: SecretString::from("sk_test_abc"),
                api_base: DEFAULT_STRIPE_API_BASE.to_string(),
            },
            catalog: CatalogConfig::default(),
            checkout: CheckoutConfig::for_base_url("http://localhost:3000"),
            sentry_dsn: None,
            sentry_environment: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_stripe_config_debug_redacts_secret() {
        let config = StripeConfig {
            secret_key: SecretString::from("sk_live_super_secret_value"),
            api_base: DEFAULT_STRIPE_API_BASE.to_string(),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("api.stripe.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_value"));
    }
}
