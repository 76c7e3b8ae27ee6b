//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `GITSERVER_API_BASE_URL` - Base API address (default: /api/v1). Relative
//!   paths are resolved against `GITSERVER_ORIGIN`.
//! - `GITSERVER_ORIGIN` - Origin for a relative base address
//!   (default: <http://localhost:8080>)
//! - `GITSERVER_TIMEOUT_MS` - Per-request timeout in milliseconds (default: 10000)
//! - `GITSERVER_SESSION_FILE` - Persisted session file
//!   (default: .gitserver/session.json)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default base API path.
pub const DEFAULT_API_BASE: &str = "/api/v1";

/// Default origin for a relative base address.
pub const DEFAULT_ORIGIN: &str = "http://localhost:8080";

/// Default per-request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Default location of the persisted session.
pub const DEFAULT_SESSION_FILE: &str = ".gitserver/session.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Invalid base URL {0}: {1}")]
    InvalidBaseUrl(String, String),
}

/// Gateway and session configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Absolute base address every request path is appended to, without a
    /// trailing slash.
    pub base_url: String,
    /// Fixed per-request timeout.
    pub timeout: Duration,
    /// Where the CLI persists the session between runs.
    pub session_file: PathBuf,
}

impl ClientConfig {
    /// Build a configuration for an absolute base address with default
    /// timeout and session file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBaseUrl` if `base_url` is not an absolute
    /// http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: resolve_base_url(base_url, None)?,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
        })
    }

    /// Override the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the session file location.
    #[must_use]
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = path.into();
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let origin = get_env_or_default("GITSERVER_ORIGIN", DEFAULT_ORIGIN);
        let base = get_env_or_default("GITSERVER_API_BASE_URL", DEFAULT_API_BASE);
        let base_url = resolve_base_url(&base, Some(&origin))?;

        let timeout_ms = get_env_or_default("GITSERVER_TIMEOUT_MS", "10000")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("GITSERVER_TIMEOUT_MS".to_string(), e.to_string())
            })?;
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "GITSERVER_TIMEOUT_MS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let session_file =
            PathBuf::from(get_env_or_default("GITSERVER_SESSION_FILE", DEFAULT_SESSION_FILE));

        Ok(Self {
            base_url,
            timeout: Duration::from_millis(timeout_ms),
            session_file,
        })
    }

    /// Absolute URL for an API path such as `/repos/7`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Resolve a base address to an absolute URL string without trailing slash.
///
/// An absolute URL is used as-is. A relative path needs an origin to be
/// joined onto.
fn resolve_base_url(base: &str, origin: Option<&str>) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl(base.to_string(), reason);

    let url = match Url::parse(base) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let origin = origin.ok_or_else(|| invalid("relative URL without origin".to_string()))?;
            let origin = Url::parse(origin).map_err(|e| {
                ConfigError::InvalidEnvVar("GITSERVER_ORIGIN".to_string(), e.to_string())
            })?;
            origin.join(base).map_err(|e| invalid(e.to_string()))?
        }
        Err(e) => return Err(invalid(e.to_string())),
    };

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an environment variable or a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_base_joins_origin() {
        let base = resolve_base_url(DEFAULT_API_BASE, Some(DEFAULT_ORIGIN)).unwrap();
        assert_eq!(base, "http://localhost:8080/api/v1");
    }

    #[test]
    fn test_absolute_base_is_kept() {
        let base =
            resolve_base_url("https://git.example.com/api/v1/", Some(DEFAULT_ORIGIN)).unwrap();
        assert_eq!(base, "https://git.example.com/api/v1");
    }

    #[test]
    fn test_relative_base_without_origin_fails() {
        assert!(matches!(
            resolve_base_url("/api/v1", None),
            Err(ConfigError::InvalidBaseUrl(..))
        ));
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        assert!(matches!(
            resolve_base_url("ftp://example.com/api", None),
            Err(ConfigError::InvalidBaseUrl(..))
        ));
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let config = ClientConfig::new("http://127.0.0.1:9000/api/v1/").unwrap();
        assert_eq!(config.endpoint("/repos"), "http://127.0.0.1:9000/api/v1/repos");
        assert_eq!(
            config.endpoint("repos/7/collaborators"),
            "http://127.0.0.1:9000/api/v1/repos/7/collaborators"
        );
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("http://127.0.0.1:9000/api/v1").unwrap();
        assert_eq!(config.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert_eq!(config.session_file, PathBuf::from(DEFAULT_SESSION_FILE));

        let config = config
            .with_timeout(Duration::from_millis(250))
            .with_session_file("/tmp/session.json");
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.session_file, PathBuf::from("/tmp/session.json"));
    }
}
