use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the gradlens pipeline.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// A configured column index does not exist in the source grid.
    ///
    /// Fatal for that sheet's load: continuing would silently misalign every
    /// downstream field.
    #[error("Schema mismatch in sheet \"{sheet}\": field \"{field}\" maps to column {column}, but the grid is only {width} columns wide")]
    SchemaMismatch {
        sheet: String,
        field: String,
        column: usize,
        width: usize,
    },

    /// A schema references a field it does not define.
    #[error("Schema for sheet \"{sheet}\" has no field \"{field}\"")]
    UnknownField { sheet: String, field: String },

    /// A named sheet was not found in the workbook snapshot.
    #[error("Sheet not found in workbook: {0}")]
    SheetNotFound(String),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A year-month string did not match the `YYYY-MM` form.
    #[error("Invalid year-month: {0}")]
    YearMonthParse(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the gradlens crates.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
