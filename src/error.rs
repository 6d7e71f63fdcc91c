//! Error types for the Dimensions client.

use std::time::Duration;

/// Errors that can occur when interacting with the Dimensions DSL API.
///
/// Rate limiting (HTTP 429) and expired tokens (HTTP 403) never show up here:
/// the query executor resolves them by waiting or logging in again. Application
/// errors reported by the DSL (HTTP 400/500 with a JSON body) are not errors
/// either; they are delivered inside [`DslResult`](crate::DslResult).
#[derive(Debug, thiserror::Error)]
pub enum DslError {
    /// HTTP request failed (network, timeout, etc.)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Unexpected HTTP status after the retry budget was used up.
    #[error("API error (HTTP {status}): {body}")]
    Status { status: u16, body: String },

    /// Login was rejected or the auth response carried no token.
    #[error("Authentication failed (HTTP {status}): {message}")]
    Authentication { status: u16, message: String },

    /// The token expired mid-query (HTTP 403) and logging in again failed.
    #[error("Session expired and re-login failed: {0}")]
    Reauthentication(#[source] Box<DslError>),

    /// A loop page came back with an `errors` payload.
    #[error("Query failed: {0}")]
    Query(String),

    /// The query cannot be run as requested (e.g. pagination clauses in a loop query).
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A loop query hit the server's skip window before collecting every record.
    #[error("Loop query stopped at the skip window after {fetched} records (total: {})", .total.map_or_else(|| "unknown".to_string(), |t| t.to_string()))]
    Truncated { fetched: u64, total: Option<u64> },

    /// A loop query ran past its deadline.
    #[error("Loop query exceeded its deadline of {0:?}")]
    Timeout(Duration),

    /// Credentials missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error while reading or writing the credentials file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ini::Error> for DslError {
    fn from(err: ini::Error) -> Self {
        match err {
            ini::Error::Io(e) => DslError::Io(e),
            ini::Error::Parse(e) => DslError::Config(format!("Malformed credentials file: {}", e)),
        }
    }
}

/// Convenience alias for Results using [`DslError`].
pub type Result<T> = std::result::Result<T, DslError>;
