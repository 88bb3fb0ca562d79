//! Error types
//!
//! `TableError` covers the pure table operations (loading, filtering,
//! aggregating) and knows nothing about files. `DigestError` is what the
//! pipeline and the collector return; it attaches the offending path.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure while parsing, filtering or reducing a single table
#[derive(Error, Debug)]
pub enum TableError {
    #[error("line {line}: {message}")]
    Parse { line: u64, message: String },

    #[error("line {line}: expected {expected} fields, found {found}")]
    RaggedRow { line: u64, expected: usize, found: usize },

    #[error("no data rows after the header")]
    NoRows,

    #[error("column {column} is out of range (table has {columns} columns)")]
    ColumnOutOfRange { column: usize, columns: usize },

    #[error("every row was removed by the filter chain")]
    Empty,
}

impl TableError {
    /// Errors caused by the input data rather than by the configuration
    pub fn is_data_error(&self) -> bool {
        !matches!(self, TableError::ColumnOutOfRange { .. })
    }
}

/// Run-level failure
#[derive(Error, Debug)]
pub enum DigestError {
    #[error("{}: {source}", path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: TableError,
    },

    #[error("cannot open {}: {source}", path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write JSON export: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to launch {}: {source}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Config(String),
}

impl DigestError {
    pub fn table(path: impl Into<PathBuf>, source: TableError) -> Self {
        DigestError::Table { path: path.into(), source }
    }

    pub fn resource(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DigestError::Resource { path: path.into(), source }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DigestError::Io { path: path.into(), source }
    }

    /// Whether `--skip-invalid` may step over this error and continue
    pub fn is_skippable(&self) -> bool {
        match self {
            DigestError::Table { source, .. } => source.is_data_error(),
            _ => false,
        }
    }
}
