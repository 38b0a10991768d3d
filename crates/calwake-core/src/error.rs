//! Core error types for calwake-core.
//!
//! No error in this crate is fatal to a host process: every failure is meant
//! to degrade to "fewer notifications". Planner entry points catch and log at
//! the component boundary; nothing propagates to the trigger mechanism.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for calwake-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Schedule store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Calendar source errors
    #[error("Event source error: {0}")]
    EventSource(#[from] EventSourceError),

    /// Timer port errors
    #[error("Timer error: {0}")]
    Timer(#[from] TimerPortError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the persistent schedule store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the store database
    #[error("Failed to open schedule store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Store query failed: {0}")]
    QueryFailed(String),

    /// Persisted record failed to parse.
    ///
    /// Callers treat the record as empty and rebuild on the next refresh;
    /// this variant exists for logging, not control flow.
    #[error("Persisted record '{key}' is corrupt: {message}")]
    Corrupt { key: String, message: String },
}

/// Errors from the external calendar source.
#[derive(Error, Debug)]
pub enum EventSourceError {
    /// The host has no read access to calendar data. A refresh no-ops on
    /// this; it is retried when the host signals a permission grant.
    #[error("Calendar read permission not granted")]
    PermissionDenied,

    /// The source is temporarily unavailable.
    #[error("Event source unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the host timer facility.
#[derive(Error, Debug)]
pub enum TimerPortError {
    /// The host refused to arm the timer. The event stays unalarmed and is
    /// retried on the next refresh if still in-window.
    #[error("Timer port rejected arm request: {0}")]
    Rejected(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::QueryFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
