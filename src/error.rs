//! Error types and handling for chargesync
//!
//! This module defines the crate-wide error type. Failures reported by the
//! remote service itself live in [`crate::client::ApiError`] and are
//! classified into this type at the coordinator and setup boundaries.

use thiserror::Error;

/// Result type alias for chargesync operations
pub type Result<T> = std::result::Result<T, ChargeSyncError>;

/// Main error type for chargesync
#[derive(Debug, Clone, Error)]
pub enum ChargeSyncError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Credentials were rejected; the user has to re-authenticate
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// The service could not be reached during setup
    #[error("Service not ready: {message}")]
    NotReady { message: String },

    /// A refresh cycle failed; the previous snapshot is still available
    #[error("Update failed: {message}")]
    UpdateFailed { message: String },

    /// An action call to the remote service failed
    #[error("API error: {message}")]
    Api { message: String },

    /// Action rejected before any network call
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Unknown account, charger or entity
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl ChargeSyncError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        ChargeSyncError::Config {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        ChargeSyncError::Io {
            message: message.into(),
        }
    }

    /// Create a new auth error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        ChargeSyncError::Auth {
            message: message.into(),
        }
    }

    /// Create a new not-ready error
    pub fn not_ready<S: Into<String>>(message: S) -> Self {
        ChargeSyncError::NotReady {
            message: message.into(),
        }
    }

    /// Create a new update failure
    pub fn update_failed<S: Into<String>>(message: S) -> Self {
        ChargeSyncError::UpdateFailed {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        ChargeSyncError::Api {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        ChargeSyncError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        ChargeSyncError::NotFound {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        ChargeSyncError::Generic {
            message: message.into(),
        }
    }

    /// Whether the host has to ask the user for new credentials
    pub fn requires_reauth(&self) -> bool {
        matches!(self, ChargeSyncError::Auth { .. })
    }
}

impl From<std::io::Error> for ChargeSyncError {
    fn from(err: std::io::Error) -> Self {
        ChargeSyncError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for ChargeSyncError {
    fn from(err: serde_yaml::Error) -> Self {
        ChargeSyncError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ChargeSyncError {
    fn from(err: serde_json::Error) -> Self {
        ChargeSyncError::Serialization {
            message: err.to_string(),
        }
    }
}
