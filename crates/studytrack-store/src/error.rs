//! Store error types.

use thiserror::Error;

/// Errors that can occur when talking to a persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// A response or stored blob could not be decoded.
    #[error("failed to decode {what}: {message}")]
    Decode { what: String, message: String },

    /// A local blob could not be read or written.
    #[error("storage I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The store was configured to fail (mock only).
    #[error("injected failure: {0}")]
    Injected(String),
}
