//! `StorageClient` implementation.

use reqwest::Url;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ProxyError;
use crate::types::{ProxyOperation, ProxyRequest};
use crate::{ProxyConfig, StorageClient, USER_AGENT};

impl StorageClient {
    /// Create a client from a configuration.
    ///
    /// # Errors
    ///
    /// Returns `ProxyError::Config` if the configuration is incomplete or the
    /// HTTP client cannot be built.
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let endpoint = config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProxyError::Config(format!("failed to build http client: {e}")))?;

        Ok(Self {
            config,
            endpoint,
            http,
        })
    }

    /// Create a client from `LPSTORE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ProxyError::Config` if the project id or token is not set.
    pub fn from_env() -> Result<Self, ProxyError> {
        Self::new(ProxyConfig::from_env())
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// The parsed endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetch storage quota and usage statistics for the project.
    ///
    /// # Errors
    ///
    /// See [`call_storage_proxy`](Self::call_storage_proxy).
    pub async fn get_storage_usage(&self) -> Result<String, ProxyError> {
        self.call_storage_proxy(ProxyOperation::Usage).await
    }

    /// Fetch metadata for every file in project storage.
    ///
    /// # Errors
    ///
    /// See [`call_storage_proxy`](Self::call_storage_proxy).
    pub async fn list_project_files(&self) -> Result<String, ProxyError> {
        self.call_storage_proxy(ProxyOperation::List).await
    }

    /// Run one proxy operation and return the response as pretty-printed JSON
    /// (2-space indent, keys in the order the proxy sent them).
    ///
    /// # Errors
    ///
    /// Returns `ProxyError::Transport` on network failure or timeout and
    /// `ProxyError::MalformedResponse` if the body is not JSON.
    pub async fn call_storage_proxy(&self, op: ProxyOperation) -> Result<String, ProxyError> {
        let value = self.fetch(op).await?;
        serde_json::to_string_pretty(&value).map_err(ProxyError::Encode)
    }

    /// Run one proxy operation and return the parsed response.
    ///
    /// Exactly one POST is sent. The HTTP status is not inspected: an error
    /// payload from the proxy is returned like any other JSON.
    ///
    /// # Errors
    ///
    /// Same as [`call_storage_proxy`](Self::call_storage_proxy).
    pub async fn fetch(&self, op: ProxyOperation) -> Result<Value, ProxyError> {
        let request = ProxyRequest::new(&self.config.project_id, &self.config.token, op);

        debug!(operation = %op, endpoint = %self.endpoint, "calling storage proxy");

        let resp = self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.bytes().await?;

        debug!(
            operation = %op,
            status = status.as_u16(),
            bytes = body.len(),
            "storage proxy responded"
        );

        serde_json::from_slice(&body).map_err(|e| {
            warn!(
                operation = %op,
                status = status.as_u16(),
                error = %e,
                "storage proxy body is not JSON"
            );
            ProxyError::malformed(e, &String::from_utf8_lossy(&body))
        })
    }
}
