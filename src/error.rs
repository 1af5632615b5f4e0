//! Centralized error types for migration-gate
//!
//! Uses thiserror for typed errors that can be matched on,
//! while still being compatible with anyhow for propagation.

use thiserror::Error;

/// Top-level error type for gate operations
#[derive(Error, Debug)]
pub enum GateError {
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Migration gate blocked {blocked} of {total} migration(s)")]
    Blocked { blocked: usize, total: usize },
}

/// Failures of external lookups (database metadata, filesystem)
///
/// Validators convert these into findings; they never abort an analysis.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Database query failed: {message}")]
    Database { message: String },

    #[error("Filesystem check failed for {path}: {message}")]
    Filesystem { path: String, message: String },

    #[error("Unexpected response from {operation}: {message}")]
    InvalidResponse { operation: String, message: String },
}

impl From<sqlx::Error> for CollaboratorError {
    fn from(err: sqlx::Error) -> Self {
        CollaboratorError::Database {
            message: err.to_string(),
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Config file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },
}
