//! Error taxonomy shared by the store, the engine and the HTTP layer.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Unified error type for telemetry operations.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The backing store is unreachable, timed out, or failed mid-query.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Input was rejected before it touched the store.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A lookup matched nothing.
    #[error("not found: {0}")]
    NotFound(String),

    /// Startup configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Failure while persisting an uploaded file.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected internal failure (serialization and similar).
    #[error("internal error: {0}")]
    Internal(String),
}

impl TelemetryError {
    /// Shorthand for [`TelemetryError::StoreUnavailable`].
    pub fn store(message: impl Into<String>) -> Self {
        Self::StoreUnavailable(message.into())
    }

    /// Shorthand for [`TelemetryError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<sqlx::Error> for TelemetryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("record not found".to_string()),
            sqlx::Error::PoolTimedOut => Self::StoreUnavailable("connection pool timed out".to_string()),
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}
