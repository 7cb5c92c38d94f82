//! Console configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CONSOLE_API_URL` - Base URL of the remote resource API (http or https)
//!
//! ## Optional
//! - `CONSOLE_API_TOKEN` - Bearer token sent with every API request
//! - `CONSOLE_PER_PAGE` - Rows per list page (default: 6)
//! - `CONSOLE_SEARCH_DEBOUNCE_MS` - Quiet period before a search applies (default: 500)
//! - `CONSOLE_BOOTSTRAP_ATTEMPTS` - Identity probe attempts on transient failure (default: 3)
//! - `CONSOLE_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_PER_PAGE: u32 = 6;
const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 500;
const DEFAULT_BOOTSTRAP_ATTEMPTS: u32 = 3;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Console configuration.
#[derive(Clone)]
pub struct ConsoleConfig {
    /// Base URL of the remote resource API. Always ends with `/`.
    pub api_url: Url,
    /// Optional bearer token (for headless operation without a cookie login)
    pub api_token: Option<SecretString>,
    /// Rows per list page
    pub per_page: u32,
    /// Quiet period before a typed search term is applied
    pub search_debounce: Duration,
    /// Total identity probe attempts when failures are transient
    pub bootstrap_attempts: u32,
    /// Per-request timeout for the HTTP client
    pub request_timeout: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for ConsoleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("per_page", &self.per_page)
            .field("search_debounce", &self.search_debounce)
            .field("bootstrap_attempts", &self.bootstrap_attempts)
            .field("request_timeout", &self.request_timeout)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl ConsoleConfig {
    /// Configuration with defaults for everything but the API URL.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url: with_trailing_slash(api_url),
            api_token: None,
            per_page: DEFAULT_PER_PAGE,
            search_debounce: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
            bootstrap_attempts: DEFAULT_BOOTSTRAP_ATTEMPTS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `CONSOLE_API_URL` is missing or any variable fails
    /// to parse or validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = parse_api_url(&get_required_env("CONSOLE_API_URL")?)?;

        let per_page = get_parsed_env("CONSOLE_PER_PAGE", DEFAULT_PER_PAGE)?;
        if per_page == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CONSOLE_PER_PAGE".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let bootstrap_attempts =
            get_parsed_env("CONSOLE_BOOTSTRAP_ATTEMPTS", DEFAULT_BOOTSTRAP_ATTEMPTS)?;
        if bootstrap_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CONSOLE_BOOTSTRAP_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            api_url,
            api_token: get_optional_env("CONSOLE_API_TOKEN").map(SecretString::from),
            per_page,
            search_debounce: Duration::from_millis(get_parsed_env(
                "CONSOLE_SEARCH_DEBOUNCE_MS",
                DEFAULT_SEARCH_DEBOUNCE_MS,
            )?),
            bootstrap_attempts,
            request_timeout: Duration::from_secs(get_parsed_env(
                "CONSOLE_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

/// Parse and normalize the API base URL.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar("CONSOLE_API_URL".to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "CONSOLE_API_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(with_trailing_slash(url))
}

/// `Url::join` drops the last path segment unless the base ends with `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an optional environment variable parsed into `T`.
fn get_parsed_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_url_adds_trailing_slash() {
        let url = parse_api_url("https://api.example.com/api/v1").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/api/v1/");
        assert_eq!(
            url.join("users").unwrap().as_str(),
            "https://api.example.com/api/v1/users"
        );
    }

    #[test]
    fn test_parse_api_url_rejects_other_schemes() {
        let err = parse_api_url("ftp://files.example.com").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_parse_api_url_rejects_garbage() {
        assert!(parse_api_url("not a url").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = ConsoleConfig::new(Url::parse("http://localhost:5501").unwrap());
        assert_eq!(config.per_page, 6);
        assert_eq!(config.search_debounce, Duration::from_millis(500));
        assert_eq!(config.bootstrap_attempts, 3);
        assert_eq!(config.api_url.as_str(), "http://localhost:5501/");
    }

    #[test]
    fn test_debug_redacts_token() {
        let mut config = ConsoleConfig::new(Url::parse("http://localhost:5501").unwrap());
        config.api_token = Some(SecretString::from("super_secret_token_value"));

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("localhost:5501"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_token_value"));
    }
}
