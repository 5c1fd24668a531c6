//! Client configuration.
//!
//! The project identity, credential and endpoint are plain inputs. They can be
//! supplied directly or loaded from `LPSTORE_*` environment variables.

use std::fmt;
use std::time::Duration;

use reqwest::Url;

use crate::error::ProxyError;

/// Storage proxy endpoint used when none is configured.
pub const DEFAULT_ENDPOINT_URL: &str = "https://launchpulse.ai/api/storage/proxy";
/// Upper bound on a single proxy call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable holding the project id.
pub const ENV_PROJECT_ID: &str = "LPSTORE_PROJECT_ID";
/// Environment variable holding the proxy token.
pub const ENV_TOKEN: &str = "LPSTORE_TOKEN";
/// Environment variable overriding the endpoint URL.
pub const ENV_ENDPOINT_URL: &str = "LPSTORE_ENDPOINT_URL";
/// Environment variable overriding the timeout, in whole seconds.
pub const ENV_TIMEOUT_SECS: &str = "LPSTORE_TIMEOUT_SECS";

/// Configuration for a [`StorageClient`](crate::StorageClient).
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Project whose storage is queried. Passed through unmodified.
    pub project_id: String,
    /// Opaque credential for the proxy. Passed through unmodified.
    pub token: String,
    /// Full URL of the proxy endpoint. Default: `https://launchpulse.ai/api/storage/proxy`.
    pub endpoint_url: String,
    /// Request timeout. Default: 30 seconds.
    pub timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            token: String::new(),
            endpoint_url: DEFAULT_ENDPOINT_URL.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

// Keeps the token out of logs and panic messages.
impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("project_id", &self.project_id)
            .field("token", &redact(&self.token))
            .field("endpoint_url", &self.endpoint_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProxyConfig {
    /// Config for a project with the default endpoint and timeout.
    pub fn new(project_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            token: token.into(),
            ..Self::default()
        }
    }

    /// Override the endpoint URL.
    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = endpoint_url.into();
        self
    }

    /// Override the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `LPSTORE_PROJECT_ID` — project id (required before a client can be built)
    /// - `LPSTORE_TOKEN` — proxy token (required before a client can be built)
    /// - `LPSTORE_ENDPOINT_URL` — proxy endpoint (default: `https://launchpulse.ai/api/storage/proxy`)
    /// - `LPSTORE_TIMEOUT_SECS` — request timeout in seconds (default: `30`)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let endpoint_url =
            non_empty(ENV_ENDPOINT_URL).unwrap_or_else(|| DEFAULT_ENDPOINT_URL.to_owned());

        let timeout = non_empty(ENV_TIMEOUT_SECS)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs);

        Self {
            project_id: non_empty(ENV_PROJECT_ID).unwrap_or_default(),
            token: non_empty(ENV_TOKEN).unwrap_or_default(),
            endpoint_url,
            timeout,
        }
    }

    /// Check the config and parse the endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns `ProxyError::Config` if the project id or token is empty, the
    /// endpoint is not an absolute `http`/`https` URL, or the timeout is zero.
    pub fn validate(&self) -> Result<Url, ProxyError> {
        if self.project_id.is_empty() {
            return Err(ProxyError::Config(format!(
                "missing project id — set {ENV_PROJECT_ID} or pass it in config"
            )));
        }
        if self.token.is_empty() {
            return Err(ProxyError::Config(format!(
                "missing token — set {ENV_TOKEN} or pass it in config"
            )));
        }
        if self.timeout.is_zero() {
            return Err(ProxyError::Config("timeout must be non-zero".to_owned()));
        }

        let url = Url::parse(self.endpoint_url.trim()).map_err(|e| {
            ProxyError::Config(format!("invalid endpoint url '{}': {e}", self.endpoint_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProxyError::Config(format!(
                "endpoint url must be http or https, got '{}'",
                url.scheme()
            )));
        }
        Ok(url)
    }
}

/// Mask a credential for display, keeping a short prefix.
pub fn redact(token: &str) -> String {
    if token.is_empty() {
        return "<unset>".to_owned();
    }
    let prefix: String = token.chars().take(3).collect();
    format!("{prefix}***")
}
