//! Core error types for rivalt-core.
//!
//! Invalid mode transitions (resuming a running timer, pausing a stopped
//! one) are not errors: the engine ignores them and emits no events.
//! Errors are reserved for edits that would break an invariant.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::TimerMode;

/// Core error type for rivalt-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML decode errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
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

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Thresholds violate `final < warning < starting` (zero disables a threshold)
    #[error(
        "Invalid thresholds: final ({final_secs}s) < warning ({warning_secs}s) < starting ({starting_secs}s) must hold"
    )]
    ThresholdOrder {
        starting_secs: u64,
        warning_secs: u64,
        final_secs: u64,
    },

    /// Edit attempted while the timer is not stopped
    #[error("Timer must be stopped to change its thresholds (currently {mode})")]
    NotStopped { mode: TimerMode },

    /// Out of bounds
    #[error("Index {index} out of bounds for {collection} (length: {len})")]
    OutOfBounds {
        collection: String,
        index: usize,
        len: usize,
    },

    /// A configured cap would be exceeded
    #[error("Cannot add to {collection}: limit of {limit} reached")]
    CapacityExceeded { collection: String, limit: usize },

    /// No timer with this id exists in the model
    #[error("Unknown timer: {0}")]
    UnknownTimer(uuid::Uuid),

    /// Selection cannot move while the selected timer is active
    #[error("Cannot change selection while the selected timer is {mode}")]
    SelectionLocked { mode: TimerMode },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<toml::ser::Error> for CoreError {
    fn from(err: toml::ser::Error) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
