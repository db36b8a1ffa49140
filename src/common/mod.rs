use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while importing a spreadsheet into the database.
///
/// An absent, corrupt or mismatched table is not represented here, reading such a
/// table yields `None` instead.
#[derive(Debug, Error)]
pub(crate) enum IngestError {
    #[error("Invalid file path/name. Path {} does not exist", .0.display())]
    Path(PathBuf),

    #[error("Invalid file format. {} must be a .{expected} file", .path.display())]
    Format { path: PathBuf, expected: String },

    #[error("Unable to parse {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("Unable to read schema file {}", .path.display())]
    Schema {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema definition must create the tables {0}")]
    SchemaIncomplete(String),

    #[error("database error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Simplifies the return signature of the ingestion pipeline
pub(crate) type IngestResult<T> = Result<T, IngestError>;
