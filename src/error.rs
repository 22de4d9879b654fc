//! Error types for lovenote
//!
//! This module defines all error types used throughout the crate,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for lovenote operations
///
/// Covers configuration loading, the HTTP boundary, and the three classes of
/// authentication outcome the session layer distinguishes.
#[derive(Error, Debug)]
pub enum LovenoteError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The request never produced an HTTP response (connect, DNS, timeout)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server rejected the caller's credentials (HTTP 401)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Access token refresh failed; the session has been torn down
    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// Any other non-success HTTP response
    #[error("Request failed with status {status}: {message}")]
    Status {
        /// HTTP status code returned by the server
        status: u16,
        /// Response body, trimmed
        message: String,
    },

    /// A request could not be constructed (bad header value, bad path)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl LovenoteError {
    /// Returns `true` for errors that mean the caller is not (or no longer)
    /// signed in.
    ///
    /// # Examples
    ///
    /// ```
    /// use lovenote::error::LovenoteError;
    ///
    /// assert!(LovenoteError::Authentication("nope".into()).is_auth_failure());
    /// assert!(!LovenoteError::Transport("refused".into()).is_auth_failure());
    /// ```
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Authentication(_) | Self::SessionExpired(_))
    }
}

/// Result type alias for lovenote operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type.
/// Typed failures are recovered with `err.downcast_ref::<LovenoteError>()`.
pub type Result<T> = anyhow::Result<T>;
