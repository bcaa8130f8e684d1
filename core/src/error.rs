//! Error types for the Workfront API client.
//!
//! # Design
//! Every failure surfaces synchronously as the result of the operation that
//! caused it; nothing is retried internally. Server-reported failures keep
//! the message from the `{error: {message}}` envelope so callers can show it
//! verbatim, while transport-level failures carry the underlying description.

use thiserror::Error;

/// Errors returned by [`crate::Client`] operations.
#[derive(Debug, Error)]
pub enum WorkfrontError {
    /// The HTTP transport cannot serve the configured host.
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    /// `login` was called without a username or password and the
    /// configuration supplied no default for it.
    #[error("please provide both a username and password")]
    MissingCredentials,

    /// `batch_end` was called with nothing queued (or outside batch mode).
    #[error("batch operations must specify at least one 'uri' parameter")]
    EmptyBatch,

    /// The HTTP exchange itself failed: connect error, timeout, DNS failure,
    /// or a non-2xx status without a readable envelope.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with an `error` envelope.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body carried neither `data` nor `error`.
    #[error("invalid response from server: {0}")]
    MalformedResponse(String),

    /// A caller-supplied argument cannot be turned into a request.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl WorkfrontError {
    /// The server-supplied message, when this is an [`WorkfrontError::Api`] error.
    pub fn api_message(&self) -> Option<&str> {
        match self {
            WorkfrontError::Api { message, .. } => Some(message),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkfrontError>;
