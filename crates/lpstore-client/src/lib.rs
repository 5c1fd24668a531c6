//! Client for the LaunchPulse storage proxy.
//!
//! The proxy exposes two read-only operations for a project: aggregate usage
//! statistics and the list of stored files. Both are a single JSON POST whose
//! response is returned to the caller as pretty-printed JSON, untouched.
//!
//! # Example
//!
//! ```rust,no_run
//! use lpstore_client::{ProxyConfig, StorageClient};
//!
//! # async fn example() -> Result<(), lpstore_client::ProxyError> {
//! let client = StorageClient::new(ProxyConfig::new("my-project", "lp_token"))?;
//! let usage = client.get_storage_usage().await?;
//! println!("{usage}");
//! # Ok(())
//! # }
//! ```

mod client;
pub mod config;
mod error;
mod types;

pub use config::{DEFAULT_ENDPOINT_URL, DEFAULT_TIMEOUT, ProxyConfig};
pub use error::ProxyError;
pub use types::{FileMetadata, ProxyOperation, UsageStats, format_bytes};

use reqwest::Url;

const USER_AGENT: &str = concat!("lpstore/", env!("CARGO_PKG_VERSION"));

/// Storage proxy client bound to one project and credential.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct StorageClient {
    config: ProxyConfig,
    endpoint: Url,
    http: reqwest::Client,
}
