//! Custom error types for the imputation pipeline.
//!
//! This module provides the error hierarchy using `thiserror`. Only fatal
//! conditions are errors: the two recoverable abort paths (no missing
//! targets, insufficient training data) are modeled as
//! [`crate::types::ImputationOutcome`] values instead.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the imputation pipeline.
#[derive(Error, Debug)]
pub enum ImputeError {
    /// A configured column was absent from one of the input tables.
    ///
    /// Column reconciliation assumes both sources conform to the known
    /// schema, so this fails loudly rather than producing malformed
    /// features.
    #[error("Column '{column}' not found in {source_table}")]
    ColumnNotFound { column: String, source_table: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] crate::config::ConfigValidationError),

    /// A feature column could not be converted to the expected type.
    #[error("Failed to convert column '{column}' to {target_type}: {reason}")]
    TypeConversionFailed {
        column: String,
        target_type: String,
        reason: String,
    },

    /// The encoded feature matrix was empty where rows were expected.
    #[error("Empty feature matrix: {0}")]
    EmptyFeatureMatrix(String),

    /// Model training or prediction failed.
    #[error("Model error: {0}")]
    Model(String),

    /// Internal invariant violation.
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ImputeError>,
    },
}

impl ImputeError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ImputeError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code for programmatic handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound { .. } => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::TypeConversionFailed { .. } => "TYPE_CONVERSION_FAILED",
            Self::EmptyFeatureMatrix(_) => "EMPTY_FEATURE_MATRIX",
            Self::Model(_) => "MODEL_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check whether this error points at input data that does not conform
    /// to the configured schema (as opposed to an internal failure).
    pub fn is_schema_drift(&self) -> bool {
        match self {
            Self::ColumnNotFound { .. } => true,
            Self::WithContext { source, .. } => source.is_schema_drift(),
            _ => false,
        }
    }
}

/// Serialize implementation so errors can be embedded in JSON reports.
impl Serialize for ImputeError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ImputeError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for imputation operations.
pub type Result<T> = std::result::Result<T, ImputeError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ImputeError::Polars(e).with_context(context))
    }
}
