//! # Error Types
//!
//! Structured error types for blast_core. Every failure of a round
//! computation is detected before any part of a [`Round`](crate::round::Round)
//! is built, so callers either get a complete round or one of these.
//!
//! ## Example
//!
//! ```rust
//! use blast_core::errors::{DesignError, DesignResult};
//!
//! fn validate_length(length_m: f64) -> DesignResult<()> {
//!     if length_m <= 0.0 {
//!         return Err(DesignError::invalid_geometry(
//!             "length_m",
//!             length_m.to_string(),
//!             "Advance must be positive",
//!         ));
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for blast_core operations
pub type DesignResult<T> = Result<T, DesignError>;

/// Structured error type for round design and storage operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum DesignError {
    /// Width, height or advance is non-positive (or not a number)
    #[error("Invalid geometry for '{field}': {value} - {reason}")]
    InvalidGeometry {
        field: String,
        value: String,
        reason: String,
    },

    /// Manual model without a usable burden/spacing, or a derivation that cannot run
    #[error("Invalid burden/spacing for '{field}': {value} - {reason}")]
    InvalidBurdenSpacing {
        field: String,
        value: String,
        reason: String,
    },

    /// Grid generation produced no holes
    #[error("Cannot design round for this section: {reason}")]
    EmptyGrid { reason: String },

    /// Explosive mass cannot be distributed (no holes, zero weights, zero charge)
    #[error("No explosive distribution possible: {reason}")]
    NoExplosiveDistribution { reason: String },

    /// A design configuration value is out of range or inconsistent
    #[error("Invalid configuration for '{field}': {reason}")]
    InvalidConfig { field: String, reason: String },

    /// Round id not present in the log
    #[error("Round not found: {id}")]
    RoundNotFound { id: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// File is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON/TOML serialization or deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl DesignError {
    /// Create an InvalidGeometry error
    pub fn invalid_geometry(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        DesignError::InvalidGeometry {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidBurdenSpacing error
    pub fn invalid_burden_spacing(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        DesignError::InvalidBurdenSpacing {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an EmptyGrid error
    pub fn empty_grid(reason: impl Into<String>) -> Self {
        DesignError::EmptyGrid {
            reason: reason.into(),
        }
    }

    /// Create a NoExplosiveDistribution error
    pub fn no_distribution(reason: impl Into<String>) -> Self {
        DesignError::NoExplosiveDistribution {
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DesignError::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        DesignError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>, locked_by: impl Into<String>, locked_at: impl Into<String>) -> Self {
        DesignError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Check if this is a recoverable error (e.g., can retry)
    ///
    /// Design computations are pure, so only contention on the log file
    /// can go away by itself.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DesignError::FileLocked { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            DesignError::InvalidGeometry { .. } => "INVALID_GEOMETRY",
            DesignError::InvalidBurdenSpacing { .. } => "INVALID_BURDEN_SPACING",
            DesignError::EmptyGrid { .. } => "EMPTY_GRID",
            DesignError::NoExplosiveDistribution { .. } => "NO_EXPLOSIVE_DISTRIBUTION",
            DesignError::InvalidConfig { .. } => "INVALID_CONFIG",
            DesignError::RoundNotFound { .. } => "ROUND_NOT_FOUND",
            DesignError::FileError { .. } => "FILE_ERROR",
            DesignError::FileLocked { .. } => "FILE_LOCKED",
            DesignError::SerializationError { .. } => "SERIALIZATION_ERROR",
            DesignError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = DesignError::invalid_geometry("width_m", "-5.2", "Width must be positive");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"type\":\"InvalidGeometry\""));
        let roundtrip: DesignError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(DesignError::empty_grid("test").error_code(), "EMPTY_GRID");
        assert_eq!(
            DesignError::no_distribution("weights sum to zero").error_code(),
            "NO_EXPLOSIVE_DISTRIBUTION"
        );
        assert_eq!(
            DesignError::invalid_burden_spacing("burden_m", "0", "must be positive").error_code(),
            "INVALID_BURDEN_SPACING"
        );
    }

    #[test]
    fn test_only_lock_is_recoverable() {
        assert!(DesignError::file_locked("log.trn", "someone", "now").is_recoverable());
        assert!(!DesignError::empty_grid("degenerate").is_recoverable());
        assert!(!DesignError::no_distribution("zero").is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let error = DesignError::empty_grid("no columns fit");
        assert_eq!(error.to_string(), "Cannot design round for this section: no columns fit");
    }
}
