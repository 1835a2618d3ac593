//! Error taxonomy for the proxy pipeline.
//!
//! Three failure classes surface to the top level: malformed inbound
//! bodies, origin response shape violations, and origin transport
//! failures. Cache write failures are deliberately absent; they are
//! logged and dropped by the assembler and never reach the caller.

use thiserror::Error;

/// Errors from forwarding a miss set to the origin.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UpstreamError {
    /// Request exceeded the configured timeout duration.
    #[error("Request timeout")]
    Timeout,

    /// Failed to reach the origin endpoint. Carries a sanitized
    /// description, never the raw transport error text.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Non-2xx status from the origin.
    #[error("HTTP error: {0}")]
    HttpStatus(u16, String),

    /// The origin's batched response was not a JSON array.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The origin's batched response array length disagrees with the
    /// number of dispatched calls.
    #[error("Count mismatch: dispatched {expected} calls, origin returned {actual} results")]
    CountMismatch { expected: usize, actual: usize },

    /// Origin response body could not be parsed as JSON.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl UpstreamError {
    /// Maps a transport error to a sanitized variant. Raw reqwest error
    /// text can embed internal URLs and is never forwarded.
    #[must_use]
    pub fn from_network(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::ConnectionFailed("connection refused or unreachable".to_string())
        } else if error.is_body() || error.is_decode() {
            Self::ConnectionFailed("response body error".to_string())
        } else {
            Self::ConnectionFailed("network error".to_string())
        }
    }
}

/// Top-level pipeline failure.
///
/// Every variant is caught at the engine boundary and converted into a
/// best-effort plain-text diagnostic response with a success status, so
/// the edge instance never hard-crashes or emits a protocol violation.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Inbound JSON failed to parse.
    #[error("Malformed request body: {0}")]
    MalformedBody(#[from] serde_json::Error),

    /// Origin transport or validation failure. Fails the entire request;
    /// resolved cache hits are discarded, never partially returned.
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Invariant violation inside the pipeline.
    #[error("Internal error: {0}")]
    Internal(String),
}
