//! Unified error system for Quorum
//!
//! One error type shared by every layer. Each variant corresponds to a class
//! of rejection; all of them reject the single operation that raised them and
//! leave the vault state exactly as it was before the call.

use serde::{Deserialize, Serialize};

/// Unified error type for all Quorum operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum QuorumError {
    /// Malformed address, out-of-range threshold or owner-count violation
    #[error("Validation failed: {message}")]
    Validation {
        /// Error message describing the invalid input
        message: String,
    },

    /// Unknown transaction or recovery id
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// Operation not permitted in the current lifecycle state
    #[error("Invalid state: {message}")]
    State {
        /// Error message describing the conflicting state
        message: String,
    },

    /// Caller lacks the required role
    #[error("Unauthorized: {message}")]
    Authorization {
        /// Error message describing the missing role
        message: String,
    },

    /// The applied external effect failed
    #[error("Effect failed: {message}")]
    EffectFailure {
        /// Error message reported by the effect layer
        message: String,
    },

    /// Host-side fault (encoding, busy state)
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl QuorumError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create an authorization error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    /// Create an effect failure
    pub fn effect_failure(message: impl Into<String>) -> Self {
        Self::EffectFailure {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Short stable label for the error class, used in logs and CLI output
    pub fn kind(&self) -> &'static str {
        match self {
            QuorumError::Validation { .. } => "validation",
            QuorumError::NotFound { .. } => "not_found",
            QuorumError::State { .. } => "state",
            QuorumError::Authorization { .. } => "authorization",
            QuorumError::EffectFailure { .. } => "effect_failure",
            QuorumError::Internal { .. } => "internal",
        }
    }
}

/// Standard Result type for Quorum operations
pub type QuorumResult<T> = std::result::Result<T, QuorumError>;

impl From<std::io::Error> for QuorumError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            _ => Self::internal(err.to_string()),
        }
    }
}

impl From<toml::de::Error> for QuorumError {
    fn from(err: toml::de::Error) -> Self {
        Self::validation(format!("invalid configuration: {err}"))
    }
}
