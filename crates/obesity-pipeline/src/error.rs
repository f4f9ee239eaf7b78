//! Error types for the obesity prediction pipeline.
//!
//! This module provides the error hierarchy using `thiserror`. Every public
//! operation returns [`Result<T>`](Result), and every error carries a stable
//! code (see [`PipelineError::error_code`]) so callers such as the CLI or a
//! dashboard can branch on the kind of failure.
//!
//! Unknown categories met at prediction time are deliberately *not* errors:
//! the encoders absorb them (sentinel / all-zero encoding).

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

use crate::config::ConfigValidationError;

/// The main error type for the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// `predict` or `persist` was called before any train/restore.
    #[error("Pipeline not fitted or loaded")]
    NotFitted,

    /// Prediction input is not a record, a labeled row or a table.
    #[error("Malformed prediction input: {0}")]
    MalformedInput(String),

    /// The training dataset file does not exist.
    #[error("Dataset file not found at {path}")]
    DatasetNotFound { path: String },

    /// The target column is absent from the training table.
    #[error("Target column '{0}' not found in dataset")]
    TargetNotFound(String),

    /// A column needed for a computation is absent.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// The feature or training configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigValidationError),

    /// The data cannot be used for training or prediction.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A training value is not part of the declared ordinal order.
    #[error("Found unknown category '{value}' in ordinal column '{column}' during fit")]
    UnknownCategory { column: String, value: String },

    /// The artifact is not a bundle this version can read.
    #[error("Unsupported artifact: {0}")]
    Artifact(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary (bincode) serialization/deserialization error.
    #[error("Binary encoding error: {0}")]
    Binary(#[from] bincode::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PipelineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get the stable error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFitted => "NOT_FITTED",
            Self::MalformedInput(_) => "MALFORMED_INPUT",
            Self::DatasetNotFound { .. } => "DATASET_NOT_FOUND",
            Self::TargetNotFound(_) => "TARGET_NOT_FOUND",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::UnknownCategory { .. } => "UNKNOWN_CATEGORY",
            Self::Artifact(_) => "UNSUPPORTED_ARTIFACT",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Binary(_) => "BINARY_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error means the pipeline has to be trained or restored first.
    pub fn is_not_fitted(&self) -> bool {
        match self {
            Self::NotFitted => true,
            Self::WithContext { source, .. } => source.is_not_fitted(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for PipelineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PipelineError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

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
        self.map_err(|e| PipelineError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::io::Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PipelineError::Io(e).with_context(context))
    }
}
