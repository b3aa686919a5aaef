//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STORE_BACKEND_URL` - Origin of the store backend (e.g., `http://localhost:8080`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STORE_BACKEND_TIMEOUT_SECS` - Backend request timeout (default: 10)
//! - `STORE_USER_CACHE_TTL_SECS` - TTL of cached user profiles (default: 60)
//! - `STORE_CATEGORIES` - Comma-separated category labels in bit order
//! - `STORE_PAGE_SIZE` - Products per page, clamped to 40..=80 (default: 40)
//! - `STORE_PLACEHOLDER_IMAGE` - Image shown for products without images
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use online_store_core::{CategoryCatalog, CategoryError, DEFAULT_CATEGORIES};
use thiserror::Error;
use url::Url;

/// Page sizes accepted by the backend.
pub const MIN_PAGE_SIZE: u32 = 40;
pub const MAX_PAGE_SIZE: u32 = 80;

/// Default fallback image for product tiles.
pub const DEFAULT_PLACEHOLDER_IMAGE: &str = "/static/img/no-image.svg";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Invalid category list: {0}")]
    Categories(#[from] CategoryError),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Store backend connection settings
    pub backend: BackendConfig,
    /// Catalog presentation settings
    pub catalog: CatalogConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Store backend connection settings.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Backend origin; the REST API lives under `api/v1/`.
    pub url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
    /// How long public user profiles stay cached.
    pub user_cache_ttl: Duration,
}

/// Catalog presentation settings.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Ordered category labels.
    pub categories: CategoryCatalog,
    /// Products per listing page.
    pub page_size: u32,
    /// Image shown when a product has no usable image.
    pub placeholder_image: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            categories: CategoryCatalog::default(),
            page_size: MIN_PAGE_SIZE,
            placeholder_image: DEFAULT_PLACEHOLDER_IMAGE.to_string(),
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
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;

        Ok(Self {
            host,
            port,
            backend: BackendConfig::from_env()?,
            catalog: CatalogConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("STORE_BACKEND_URL")?;
        let url = Url::parse(&raw)
            .map_err(|e| ConfigError::InvalidEnvVar("STORE_BACKEND_URL".to_string(), e.to_string()))?;

        Ok(Self {
            url,
            timeout: Duration::from_secs(parse_env("STORE_BACKEND_TIMEOUT_SECS", "10")?),
            user_cache_ttl: Duration::from_secs(parse_env("STORE_USER_CACHE_TTL_SECS", "60")?),
        })
    }

    /// Create settings for a backend origin with default timeouts.
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self {
            url,
            timeout: Duration::from_secs(10),
            user_cache_ttl: Duration::from_secs(60),
        }
    }

    /// Base URL of the REST API (`{origin}/api/v1/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the origin cannot be a base URL.
    pub fn api_base(&self) -> Result<Url, url::ParseError> {
        with_trailing_slash(&self.url).join("api/v1/")
    }

    /// URL of the backend logout endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the origin cannot be a base URL.
    pub fn logout_url(&self) -> Result<Url, url::ParseError> {
        with_trailing_slash(&self.url).join("logout")
    }
}

impl CatalogConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let categories = match get_optional_env("STORE_CATEGORIES") {
            Some(raw) => CategoryCatalog::new(split_labels(&raw))?,
            None => CategoryCatalog::new(DEFAULT_CATEGORIES.iter().copied())?,
        };

        Ok(Self {
            categories,
            page_size: clamp_page_size(parse_env("STORE_PAGE_SIZE", "40")?),
            placeholder_image: get_env_or_default(
                "STORE_PLACEHOLDER_IMAGE",
                DEFAULT_PLACEHOLDER_IMAGE,
            ),
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
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to a default string.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Split a comma-separated label list, skipping blanks.
fn split_labels(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(String::from)
        .collect()
}

/// Keep the page size within the range the backend honors.
const fn clamp_page_size(size: u32) -> u32 {
    if size < MIN_PAGE_SIZE {
        MIN_PAGE_SIZE
    } else if size > MAX_PAGE_SIZE {
        MAX_PAGE_SIZE
    } else {
        size
    }
}

/// `Url::join` replaces the last path segment unless the base ends in `/`.
fn with_trailing_slash(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
