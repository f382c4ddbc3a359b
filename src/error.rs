//! Error and warning types for rusty-dash
//!
//! Loading is the only fallible stage of a session: once a dataset is in
//! memory, filtering, selection and aggregation degrade instead of failing.

use thiserror::Error;

/// Failure to turn a file into a [`crate::data::model::Dataset`].
#[derive(Error, Debug)]
pub enum LoadError {
    /// File I/O error
    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parse error
    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parse error
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Parquet reader error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Arrow decoding error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Unsupported file extension: .{extension}")]
    UnsupportedFormat { extension: String },

    #[error("Dataset has no header row")]
    MissingHeader,

    /// A header with no records under it. Fatal even though the schema
    /// itself is valid: a dashboard over zero rows has nothing to link.
    #[error("Dataset has a header but no rows")]
    EmptyDataset,

    /// A row disagrees with the header in shape
    #[error("Row {row} has {found} fields, expected {expected}")]
    RowShape {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// JSON record is not a flat object
    #[error("Record {row} is not a flat JSON object")]
    NotARecord { row: usize },

    /// JSON record lacks a key the first record defined
    #[error("Record {row} has no '{key}' field")]
    MissingKey { row: usize, key: String },

    #[error("Id column '{column}' not found in dataset")]
    MissingIdColumn { column: String },

    #[error("Id column '{column}' holds duplicate value '{value}'")]
    DuplicateId { column: String, value: String },

    /// The background loader went away without reporting
    #[error("Loader thread stopped unexpectedly")]
    Disconnected,
}

impl LoadError {
    /// Message shown in the status line when the session enters `LoadFailed`.
    pub fn user_message(&self) -> String {
        match self {
            LoadError::Io(e) => format!("Could not read file: {e}"),
            LoadError::UnsupportedFormat { extension } => {
                format!("Unsupported file format: '.{extension}'")
            }
            LoadError::RowShape {
                row,
                expected,
                found,
            } => format!("Row {row} has {found} values but the header has {expected}"),
            other => other.to_string(),
        }
    }

    /// Short title for the error banner.
    pub fn title(&self) -> &'static str {
        match self {
            LoadError::Io(_) | LoadError::Disconnected => "File Error",
            LoadError::Csv(_) | LoadError::Json(_) => "Parse Error",
            LoadError::Parquet(_) | LoadError::Arrow(_) => "Parquet Error",
            LoadError::UnsupportedFormat { .. } => "Unsupported Format",
            LoadError::MissingHeader | LoadError::EmptyDataset => "Empty Dataset",
            LoadError::RowShape { .. }
            | LoadError::NotARecord { .. }
            | LoadError::MissingKey { .. } => "Malformed Row",
            LoadError::MissingIdColumn { .. } | LoadError::DuplicateId { .. } => "Invalid Id Column",
        }
    }
}

/// Failure to read a dashboard configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Non-fatal conditions reported alongside a snapshot.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashWarning {
    /// The current filter conjunction matches no rows.
    #[error("No rows match the current filters")]
    EmptyResult,
}
