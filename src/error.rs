//! Error types for RunLog Oxide
//!
//! Row- and field-local problems never reach this type: the stages recover
//! them in place (invalid timestamps, dropped rows, absent values). Only
//! structural problems with the input or the configuration surface here.

use thiserror::Error;

/// Main error type for pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    /// File I/O error
    #[error("Failed to access file: {0}")]
    FileIo(#[from] std::io::Error),

    /// Polars data processing error
    #[error("Data processing error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Unsupported file format
    #[error("Unsupported file format: {extension}")]
    UnsupportedFormat { extension: String },

    /// The declared timestamp column is not in the table header
    #[error("Timestamp column '{column}' not found in table")]
    MissingTimestampColumn { column: String },

    /// None of the declared metric columns exist
    #[error("Table has no metric columns (declared: {declared:?})")]
    NoMetricColumns { declared: Vec<String> },

    /// Column not found in data
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// A derivation output collides with an existing field
    #[error("Field '{field}' already exists")]
    DuplicateField { field: String },

    /// A series specification cannot be satisfied by its source
    #[error("Invalid series '{label}': {reason}")]
    InvalidSeries { label: String, reason: String },

    /// A series refers to a summary that was never computed
    #[error("Unknown summary '{id}'")]
    UnknownSummary { id: String },

    /// Unknown preset name
    #[error("Unknown preset '{name}'")]
    UnknownPreset { name: String },

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// UI-friendly error message formatting
impl PipelineError {
    /// Get a user-friendly error message suitable for displaying in UI
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::FileIo(e) => format!("File error: {}", e),
            PipelineError::Polars(e) => format!("Data error: {}", e),
            PipelineError::UnsupportedFormat { extension } => {
                format!("Unsupported file format: '.{}'", extension)
            }
            PipelineError::MissingTimestampColumn { column } => {
                format!("No '{}' column in this log", column)
            }
            PipelineError::NoMetricColumns { declared } => {
                format!("None of the metric columns {} are present", declared.join(", "))
            }
            PipelineError::ColumnNotFound { column } => {
                format!("Column '{}' not found", column)
            }
            PipelineError::DuplicateField { field } => {
                format!("Derived field '{}' would overwrite an existing field", field)
            }
            PipelineError::InvalidSeries { label, reason } => {
                format!("Series '{}': {}", label, reason)
            }
            PipelineError::UnknownSummary { id } => format!("Summary '{}' is not defined", id),
            PipelineError::UnknownPreset { name } => format!("No preset named '{}'", name),
            PipelineError::Config(msg) => format!("Config error: {}", msg),
            PipelineError::Json(e) => format!("JSON error: {}", e),
        }
    }

    /// Get a short title for the error (for toast notifications)
    pub fn title(&self) -> &'static str {
        match self {
            PipelineError::FileIo(_) => "File Error",
            PipelineError::Polars(_) => "Data Error",
            PipelineError::UnsupportedFormat { .. } => "Unsupported Format",
            PipelineError::MissingTimestampColumn { .. } => "Missing Timestamp",
            PipelineError::NoMetricColumns { .. } => "No Metrics",
            PipelineError::ColumnNotFound { .. } => "Column Not Found",
            PipelineError::DuplicateField { .. } => "Duplicate Field",
            PipelineError::InvalidSeries { .. } => "Invalid Series",
            PipelineError::UnknownSummary { .. } => "Unknown Summary",
            PipelineError::UnknownPreset { .. } => "Unknown Preset",
            PipelineError::Config(_) => "Configuration Error",
            PipelineError::Json(_) => "JSON Error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PipelineError::ColumnNotFound {
            column: "collisions".to_string(),
        };
        assert_eq!(err.user_message(), "Column 'collisions' not found");
        assert_eq!(err.title(), "Column Not Found");

        let err = PipelineError::NoMetricColumns {
            declared: vec!["clicks".to_string(), "frames".to_string()],
        };
        assert_eq!(
            err.user_message(),
            "None of the metric columns clicks, frames are present"
        );
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PipelineError = io_err.into();
        assert!(matches!(err, PipelineError::FileIo(_)));
    }
}
