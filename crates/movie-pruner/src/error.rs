//! Custom error types for the title pipeline and the column profiler.
//!
//! This module provides the error hierarchy using `thiserror`. Every failure
//! that aborts a run names the stage, the table and the column involved so an
//! operator can fix the input and re-run.
//!
//! Errors are serializable so the CLI can emit them as JSON.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the crate.
#[derive(Error, Debug)]
pub enum PrunerError {
    /// A file could not be opened, read or written.
    #[error("IO error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Delimited input that cannot be parsed into a relation.
    #[error("Malformed input '{}' at line {line}: {reason}", .path.display())]
    Format {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    /// Two relations about to be joined share non-key columns.
    #[error("Cannot join '{left}' with '{right}': both define column(s) {columns:?}")]
    SchemaConflict {
        left: String,
        right: String,
        columns: Vec<String>,
    },

    /// The profiler was asked about a column the classification table does not cover.
    #[error("Column '{0}' has no entry in the classification table")]
    UnknownColumn(String),

    /// A key check failed and was not remediated.
    #[error(
        "{stage} failed for column '{column}' of '{table}': {malformed} malformed value(s), most frequent: {samples:?}"
    )]
    Validation {
        stage: String,
        table: String,
        column: String,
        malformed: usize,
        samples: Vec<String>,
    },

    /// Column was not found in a relation.
    #[error("Column '{column}' not found in '{table}'")]
    ColumnNotFound { table: String, column: String },

    /// A relation would end up with two columns of the same name.
    #[error("Column '{column}' appears more than once in '{table}'")]
    DuplicateColumn { table: String, column: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal invariant violated (self-checks that should never fire).
    #[error("Internal error: {0}")]
    Internal(String),

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
        source: Box<PrunerError>,
    },
}

impl PrunerError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PrunerError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PrunerError::Io {
            path: path.into(),
            source,
        }
    }

    /// Get a stable error code for callers that branch on the failure kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "IO_ERROR",
            Self::Format { .. } => "FORMAT_ERROR",
            Self::SchemaConflict { .. } => "SCHEMA_CONFLICT",
            Self::UnknownColumn(_) => "UNKNOWN_COLUMN",
            Self::Validation { .. } => "VALIDATION_FAILURE",
            Self::ColumnNotFound { .. } => "COLUMN_NOT_FOUND",
            Self::DuplicateColumn { .. } => "DUPLICATE_COLUMN",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if the failure comes from the input data rather than the program
    /// or the environment, i.e. fixing the input and re-running should help.
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::Format { .. }
            | Self::SchemaConflict { .. }
            | Self::UnknownColumn(_)
            | Self::Validation { .. }
            | Self::ColumnNotFound { .. }
            | Self::DuplicateColumn { .. } => true,
            Self::WithContext { source, .. } => source.is_input_error(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for PrunerError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PrunerError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline and profiling operations.
pub type Result<T> = std::result::Result<T, PrunerError>;

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
        self.map_err(|e| PrunerError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            PrunerError::UnknownColumn("x".to_string()).error_code(),
            "UNKNOWN_COLUMN"
        );
        assert_eq!(
            PrunerError::ColumnNotFound {
                table: "akas".to_string(),
                column: "region".to_string()
            }
            .error_code(),
            "COLUMN_NOT_FOUND"
        );
    }

    #[test]
    fn test_validation_message_names_column_and_count() {
        let error = PrunerError::Validation {
            stage: "Key validation".to_string(),
            table: "name.basics".to_string(),
            column: "tconst".to_string(),
            malformed: 12,
            samples: vec!["\\N".to_string()],
        };
        let message = error.to_string();
        assert!(message.contains("name.basics"));
        assert!(message.contains("tconst"));
        assert!(message.contains("12"));
    }

    #[test]
    fn test_is_input_error() {
        assert!(PrunerError::UnknownColumn("x".to_string()).is_input_error());
        assert!(!PrunerError::Internal("boom".to_string()).is_input_error());
        assert!(
            PrunerError::UnknownColumn("x".to_string())
                .with_context("profiling")
                .is_input_error()
        );
    }

    #[test]
    fn test_error_serialization() {
        let error = PrunerError::UnknownColumn("budget".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("UNKNOWN_COLUMN"));
        assert!(json.contains("budget"));
    }

    #[test]
    fn test_with_context() {
        let error = PrunerError::Internal("boom".to_string()).with_context("During join");
        assert!(error.to_string().contains("During join"));
        assert_eq!(error.error_code(), "INTERNAL_ERROR");
    }
}
