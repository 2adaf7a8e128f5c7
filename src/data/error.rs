use std::path::PathBuf;

use thiserror::Error;

/// Reading or parsing the source file failed. Fatal for that file.
#[derive(Debug, Error)]
#[error("failed to load {}: {source:#}", .path.display())]
pub struct LoadError {
    pub path: PathBuf,
    #[source]
    pub source: anyhow::Error,
}

impl LoadError {
    pub fn new(path: impl Into<PathBuf>, source: anyhow::Error) -> Self {
        LoadError {
            path: path.into(),
            source,
        }
    }
}

/// The filter expression could not be parsed, or refers to something the
/// dataset does not have.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} (at position {position} in `{expression}`)")]
pub struct FilterSyntaxError {
    pub expression: String,
    pub message: String,
    /// Byte offset into `expression` where the problem was detected.
    pub position: usize,
}

impl FilterSyntaxError {
    pub fn new(expression: &str, position: usize, message: impl Into<String>) -> Self {
        FilterSyntaxError {
            expression: expression.to_string(),
            message: message.into(),
            position,
        }
    }
}

/// Summary statistics or grouping could not be computed for the selection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SummaryComputationError {
    #[error("no rows match the current filter")]
    EmptySelection,
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
    #[error("column '{column}' is {dtype}, not numeric")]
    NotNumeric { column: String, dtype: String },
    #[error("the dataset has no numeric column to summarise")]
    NoNumericColumn,
    #[error("column '{0}' has no numeric values in the current selection")]
    NoNumericData(String),
}

/// Writing the filtered rows out as CSV failed.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error while exporting: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error while exporting: {0}")]
    Csv(#[from] csv::Error),
}
