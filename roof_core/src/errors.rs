//! # Error Types
//!
//! Structured error types for roof_core. Every failure in this crate is a
//! local computation failure surfaced synchronously as a `RoofResult`; nothing
//! here retries on its own.
//!
//! ## Example
//!
//! ```rust
//! use roof_core::errors::{RoofError, RoofResult};
//!
//! fn validate_area(area_sq_ft: f64) -> RoofResult<()> {
//!     if area_sq_ft < 0.0 {
//!         return Err(RoofError::invalid_measurement(
//!             "area_sq_ft",
//!             area_sq_ft,
//!             "Area cannot be negative",
//!         ));
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for roof_core operations
pub type RoofResult<T> = Result<T, RoofError>;

/// Structured error type for measurement and report operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum RoofError {
    /// Polygon cannot be measured (too few vertices, bad coordinates)
    #[error("Invalid geometry: {reason}")]
    InvalidGeometry { reason: String },

    /// A measured quantity fed into a downstream computation is invalid
    #[error("Invalid measurement for '{field}': {value} - {reason}")]
    InvalidMeasurement {
        field: String,
        value: String,
        reason: String,
    },

    /// Report assembly was attempted without a measurement
    #[error("Missing measurement: a roof outline must be measured before assembling a report")]
    MissingMeasurement,

    /// A non-measurement input value is invalid (settings, scores, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A record was not found in a repository
    #[error("Not found: {kind} '{id}'")]
    NotFound { kind: String, id: String },

    /// The external renderer failed to produce output
    #[error("Render failed: {stage} - {reason}")]
    Render { stage: String, reason: String },

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

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RoofError {
    /// Create an InvalidGeometry error
    pub fn invalid_geometry(reason: impl Into<String>) -> Self {
        RoofError::InvalidGeometry {
            reason: reason.into(),
        }
    }

    /// Create an InvalidMeasurement error
    pub fn invalid_measurement(field: impl Into<String>, value: impl ToString, reason: impl Into<String>) -> Self {
        RoofError::InvalidMeasurement {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        RoofError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a NotFound error
    pub fn not_found(kind: impl Into<String>, id: impl ToString) -> Self {
        RoofError::NotFound {
            kind: kind.into(),
            id: id.to_string(),
        }
    }

    /// Create a Render error
    pub fn render(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        RoofError::Render {
            stage: stage.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        RoofError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>, locked_by: impl Into<String>, locked_at: impl Into<String>) -> Self {
        RoofError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Check if this is a recoverable error (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RoofError::FileLocked { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            RoofError::InvalidGeometry { .. } => "INVALID_GEOMETRY",
            RoofError::InvalidMeasurement { .. } => "INVALID_MEASUREMENT",
            RoofError::MissingMeasurement => "MISSING_MEASUREMENT",
            RoofError::InvalidInput { .. } => "INVALID_INPUT",
            RoofError::NotFound { .. } => "NOT_FOUND",
            RoofError::Render { .. } => "RENDER_FAILED",
            RoofError::FileError { .. } => "FILE_ERROR",
            RoofError::FileLocked { .. } => "FILE_LOCKED",
            RoofError::SerializationError { .. } => "SERIALIZATION_ERROR",
            RoofError::VersionMismatch { .. } => "VERSION_MISMATCH",
            RoofError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl From<serde_json::Error> for RoofError {
    fn from(e: serde_json::Error) -> Self {
        RoofError::SerializationError {
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = RoofError::invalid_measurement("base_area_sq_ft", -5.0, "Area cannot be negative");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"type\":\"InvalidMeasurement\""));
        let roundtrip: RoofError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_unit_variant_serialization() {
        let json = serde_json::to_string(&RoofError::MissingMeasurement).unwrap();
        assert_eq!(json, "{\"type\":\"MissingMeasurement\"}");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(RoofError::invalid_geometry("2 points").error_code(), "INVALID_GEOMETRY");
        assert_eq!(RoofError::MissingMeasurement.error_code(), "MISSING_MEASUREMENT");
        assert_eq!(RoofError::not_found("property", "abc").error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_only_locks_are_recoverable() {
        assert!(RoofError::file_locked("a.roof", "someone", "now").is_recoverable());
        assert!(!RoofError::MissingMeasurement.is_recoverable());
    }
}
