//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MEDUSA_BACKEND_URL` - Base URL of the commerce backend (e.g., `https://api.example.com`)
//! - `MEDUSA_TENANT_ID` - Tenant slug sent as `X-Tenant-ID` on every request
//!
//! ## Optional
//! - `MEDUSA_PUBLISHABLE_KEY` - Publishable API key (`x-publishable-api-key`)
//! - `MEDUSA_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: none)
//! - `STOREFRONT_CATALOG_CACHE_TTL_SECS` - Catalog cache TTL (default: 300, `0` disables)
//! - `STOREFRONT_STATE_DIR` - Directory for persisted client state (default: `.storefront`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Tenant header name.
pub const TENANT_HEADER: &str = "X-Tenant-ID";

/// Publishable key header name.
pub const PUBLISHABLE_KEY_HEADER: &str = "x-publishable-api-key";

const DEFAULT_CATALOG_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_STATE_DIR: &str = ".storefront";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
///
/// Implements `Debug` manually to redact the publishable key.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Backend base URL
    pub backend_url: Url,
    /// Tenant slug for the `X-Tenant-ID` header
    pub tenant_id: String,
    /// Publishable API key, when the backend requires one
    pub publishable_key: Option<SecretString>,
    /// Per-request timeout; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
    /// How long catalog reads stay cached; zero disables the cache
    pub catalog_cache_ttl: Duration,
    /// Directory for file-backed client state
    pub state_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("backend_url", &self.backend_url.as_str())
            .field("tenant_id", &self.tenant_id)
            .field(
                "publishable_key",
                &self.publishable_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout", &self.request_timeout)
            .field("catalog_cache_ttl", &self.catalog_cache_ttl)
            .field("state_dir", &self.state_dir)
            .field("sentry_dsn", &self.sentry_dsn)
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl StorefrontConfig {
    /// Minimal configuration with defaults for everything optional.
    #[must_use]
    pub fn new(backend_url: Url, tenant_id: impl Into<String>) -> Self {
        Self {
            backend_url,
            tenant_id: tenant_id.into(),
            publishable_key: None,
            request_timeout: None,
            catalog_cache_ttl: Duration::from_secs(DEFAULT_CATALOG_CACHE_TTL_SECS),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(&lookup);

        let backend_url = parse_backend_url(&vars.required("MEDUSA_BACKEND_URL")?)?;
        let tenant_id = vars.required("MEDUSA_TENANT_ID")?.trim().to_string();
        if tenant_id.is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "MEDUSA_TENANT_ID".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let request_timeout = vars
            .optional("MEDUSA_REQUEST_TIMEOUT_SECS")
            .map(|raw| parse_secs("MEDUSA_REQUEST_TIMEOUT_SECS", &raw))
            .transpose()?;
        let catalog_cache_ttl = vars
            .optional("STOREFRONT_CATALOG_CACHE_TTL_SECS")
            .map(|raw| parse_secs("STOREFRONT_CATALOG_CACHE_TTL_SECS", &raw))
            .transpose()?
            .unwrap_or(Duration::from_secs(DEFAULT_CATALOG_CACHE_TTL_SECS));

        Ok(Self {
            backend_url,
            tenant_id,
            publishable_key: vars
                .optional("MEDUSA_PUBLISHABLE_KEY")
                .map(SecretString::from),
            request_timeout,
            catalog_cache_ttl,
            state_dir: PathBuf::from(vars.or_default("STOREFRONT_STATE_DIR", DEFAULT_STATE_DIR)),
            sentry_dsn: vars.optional("SENTRY_DSN"),
            sentry_environment: vars.optional("SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Vars<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        (self.0)(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable; blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }
}

fn parse_backend_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidEnvVar("MEDUSA_BACKEND_URL".to_string(), msg);

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("URL must have a host".to_string()));
    }
    Ok(url)
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = StorefrontConfig::from_lookup(lookup(&[
            ("MEDUSA_BACKEND_URL", "https://api.example.com"),
            ("MEDUSA_TENANT_ID", "sunrise"),
        ]))
        .unwrap();

        assert_eq!(config.backend_url.as_str(), "https://api.example.com/");
        assert_eq!(config.tenant_id, "sunrise");
        assert!(config.request_timeout.is_none());
        assert_eq!(config.catalog_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.state_dir, PathBuf::from(".storefront"));
    }

    #[test]
    fn test_missing_tenant() {
        let err = StorefrontConfig::from_lookup(lookup(&[(
            "MEDUSA_BACKEND_URL",
            "https://api.example.com",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "MEDUSA_TENANT_ID"));
    }

    #[test]
    fn test_blank_tenant_rejected() {
        let err = StorefrontConfig::from_lookup(lookup(&[
            ("MEDUSA_BACKEND_URL", "https://api.example.com"),
            ("MEDUSA_TENANT_ID", "   "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_backend_url_scheme_checked() {
        let err = StorefrontConfig::from_lookup(lookup(&[
            ("MEDUSA_BACKEND_URL", "ftp://api.example.com"),
            ("MEDUSA_TENANT_ID", "sunrise"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn test_timeouts_parsed() {
        let config = StorefrontConfig::from_lookup(lookup(&[
            ("MEDUSA_BACKEND_URL", "http://localhost:9000"),
            ("MEDUSA_TENANT_ID", "sunrise"),
            ("MEDUSA_REQUEST_TIMEOUT_SECS", "15"),
            ("STOREFRONT_CATALOG_CACHE_TTL_SECS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.request_timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.catalog_cache_ttl, Duration::ZERO);

        let err = StorefrontConfig::from_lookup(lookup(&[
            ("MEDUSA_BACKEND_URL", "http://localhost:9000"),
            ("MEDUSA_TENANT_ID", "sunrise"),
            ("MEDUSA_REQUEST_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "MEDUSA_REQUEST_TIMEOUT_SECS"));
    }

    #[test]
    fn test_debug_redacts_publishable_key() {
        let config = StorefrontConfig::from_lookup(lookup(&[
            ("MEDUSA_BACKEND_URL", "https://api.example.com"),
            ("MEDUSA_TENANT_ID", "sunrise"),
            ("MEDUSA_PUBLISHABLE_KEY", "pk_live_super_secret_value"),
        ]))
        .unwrap();

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("sunrise"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("pk_live_super_secret_value"));
    }
}
