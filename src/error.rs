//! Error types for Car Price AI.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised while building a question catalog.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Catalog has no questions")]
    Empty,

    #[error("Duplicate question key: {key}")]
    DuplicateKey { key: String },
}

/// Valuation service errors.
///
/// The wizard treats every variant the same way ("submission failed"); the
/// distinction only matters for logs and for the auxiliary calls.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("Request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("Valuation service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response from valuation service: {reason}")]
    MalformedResponse { reason: String },

    #[error("Valuation service response has no numeric estimate")]
    MissingEstimate,
}

/// Errors from the CLI and web hosts.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
