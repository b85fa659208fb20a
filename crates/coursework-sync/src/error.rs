//! Error types for the sync layer
//!
//! - [`SessionError`]: what callers of [`crate::AssignmentSession`] see
//! - [`ConfigError`]: configuration loading failures

use crate::service::ServiceError;
use coursework_model::{LeafId, ModelError, ValidationError};
use std::path::PathBuf;

/// Session-level errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Initial load failed; no tree exists
    #[error("failed to load assignment: {0}")]
    Load(#[from] ServiceError),

    /// Loaded snapshot violates tree invariants
    #[error("assignment snapshot is inconsistent: {0}")]
    Invalid(#[from] ModelError),

    /// Input rejected at the edit boundary
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Field not part of this assignment
    #[error("unknown field: {0}")]
    UnknownLeaf(LeafId),

    /// Session was torn down
    #[error("session closed")]
    Closed,
}

impl SessionError {
    /// Check if the error is an input rejection to show inline
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if the caller must halt and re-authenticate
    #[inline]
    #[must_use]
    pub fn requires_reauth(&self) -> bool {
        matches!(self, Self::Load(ServiceError::AuthExpired))
    }

    /// Check if reloading may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Load(e) if e.is_retryable())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config '{}': {source}", path.display())]
    Read {
        /// Path that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for [`crate::SyncConfig`]
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parse but are unusable
    #[error("invalid config value: {0}")]
    Invalid(String),
}
