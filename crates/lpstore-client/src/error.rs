//! Error types for `lpstore-client`.
//!
//! There are no application-level errors: whatever JSON the
//! proxy returns is handed back to the caller untouched, whatever the HTTP
//! status. Only the transport and the JSON syntax of the body can fail.

/// Longest slice of a malformed body kept for diagnostics.
pub(crate) const BODY_PREVIEW_LEN: usize = 200;

/// All errors that can occur when talking to the storage proxy.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Missing or invalid client configuration. Raised at construction only.
    #[error("lpstore config error: {0}")]
    Config(String),

    /// The request never produced a complete response: DNS failure, refused
    /// connection, timeout, or the body could not be read.
    #[error("storage proxy transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body is not syntactically valid JSON.
    #[error("storage proxy returned malformed JSON ({source}): {body_preview:?}")]
    MalformedResponse {
        /// Parser error.
        source: serde_json::Error,
        /// First characters of the offending body.
        body_preview: String,
    },

    /// The request body could not be serialized.
    #[error("failed to encode proxy request: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ProxyError {
    /// Whether this is a transport failure caused by the request timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }

    /// Whether this error came from the network layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Whether the proxy answered with something that is not JSON.
    pub fn is_malformed_response(&self) -> bool {
        matches!(self, Self::MalformedResponse { .. })
    }

    pub(crate) fn malformed(source: serde_json::Error, body: &str) -> Self {
        let body_preview = match body.char_indices().nth(BODY_PREVIEW_LEN) {
            Some((idx, _)) => format!("{}…", &body[..idx]),
            None => body.to_owned(),
        };
        Self::MalformedResponse {
            source,
            body_preview,
        }
    }
}
