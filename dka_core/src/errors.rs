//! # Error Types
//!
//! Structured error types for dka_core. Every failure aborts the whole
//! calculation: a partial or default-substituted dosing result is never
//! returned. The variants let a caller tell a missing value apart from an
//! implausible one or from an unresolved protocol policy without parsing
//! message text.
//!
//! ## Example
//!
//! ```rust
//! use dka_core::errors::{CalcError, CalcResult};
//!
//! fn validate_weight(weight_kg: f64) -> CalcResult<()> {
//!     if weight_kg <= 0.0 {
//!         return Err(CalcError::out_of_range(
//!             "weight_kg",
//!             weight_kg.to_string(),
//!             "Weight must be positive",
//!         ));
//!     }
//!     Ok(())
//! }
//!
//! assert!(validate_weight(-1.0).is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for dka_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Structured error type for calculation operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// A required value is absent
    #[error("Missing required input: {field}")]
    MissingInput { field: String },

    /// A value is present but outside the physiologically plausible or
    /// clinically supported range
    #[error("Value out of range for '{field}': {value} - {reason}")]
    OutOfRange {
        field: String,
        value: String,
        reason: String,
    },

    /// Observation date precedes the birth date
    #[error(
        "Invalid date range: observation date {observation_date} is before birth date {birth_date}"
    )]
    InvalidDateRange {
        birth_date: String,
        observation_date: String,
    },

    /// A protocol policy has not been selected explicitly
    #[error("Configuration ambiguity in '{setting}': {reason}")]
    ConfigurationAmbiguity { setting: String, reason: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Settings schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl CalcError {
    /// Create a MissingInput error
    pub fn missing_input(field: impl Into<String>) -> Self {
        CalcError::MissingInput {
            field: field.into(),
        }
    }

    /// Create an OutOfRange error
    pub fn out_of_range(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CalcError::OutOfRange {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidDateRange error
    pub fn invalid_date_range(
        birth_date: impl Into<String>,
        observation_date: impl Into<String>,
    ) -> Self {
        CalcError::InvalidDateRange {
            birth_date: birth_date.into(),
            observation_date: observation_date.into(),
        }
    }

    /// Create a ConfigurationAmbiguity error
    pub fn configuration_ambiguity(setting: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::ConfigurationAmbiguity {
            setting: setting.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(
        operation: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CalcError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::MissingInput { .. } => "MISSING_INPUT",
            CalcError::OutOfRange { .. } => "OUT_OF_RANGE",
            CalcError::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            CalcError::ConfigurationAmbiguity { .. } => "CONFIGURATION_AMBIGUITY",
            CalcError::FileError { .. } => "FILE_ERROR",
            CalcError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CalcError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}

impl From<serde_json::Error> for CalcError {
    fn from(e: serde_json::Error) -> Self {
        CalcError::SerializationError { reason: e.to_string() }
    }
}
