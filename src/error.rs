use std::fmt;

use thiserror::Error;

/// Convenience result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Which stage of the pipeline classified a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadErrorKind {
    /// The declared format does not match the content well enough to extract a header row.
    FormatDetection,
    /// A header cell is not a legal column identifier.
    FieldName,
    /// A cell could not be converted to its column's committed type.
    TypeCoercion,
    /// The destination store rejected a write (or the row cannot be written at all).
    DestinationWrite,
    /// The source could not be opened or read.
    Io,
}

/// Why a header cell was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldNameProblem {
    /// Empty, illegal characters, purely numeric, reserved prefix or too long.
    Invalid,
    /// Collides with an earlier header cell.
    Duplicate,
}

impl fmt::Display for FieldNameProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => f.write_str("is not a valid field name"),
            Self::Duplicate => f.write_str("is a duplicate field name"),
        }
    }
}

/// Error type returned by every public load operation.
///
/// Each variant corresponds to one [`LoadErrorKind`]; the `Display` text is meant to be shown to
/// operators verbatim.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Content is not genuinely tabular for the declared format.
    #[error("{message}")]
    FormatDetection { message: String },

    /// A header cell failed identifier validation.
    #[error("Error with field definition: \"{name}\" {problem}")]
    FieldName {
        name: String,
        problem: FieldNameProblem,
    },

    /// A value could not be coerced to the column's committed type.
    #[error("failed to coerce value at row {row} column '{column}' to {target}: {message} (raw='{raw}')")]
    TypeCoercion {
        row: usize,
        column: String,
        raw: String,
        target: String,
        message: String,
    },

    /// The destination rejected a write; carries the store's own diagnostic text.
    #[error("Error during the load into the destination: {message}")]
    DestinationWrite { message: String },

    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    pub fn kind(&self) -> LoadErrorKind {
        match self {
            Self::FormatDetection { .. } => LoadErrorKind::FormatDetection,
            Self::FieldName { .. } => LoadErrorKind::FieldName,
            Self::TypeCoercion { .. } => LoadErrorKind::TypeCoercion,
            Self::DestinationWrite { .. } => LoadErrorKind::DestinationWrite,
            Self::Io(_) => LoadErrorKind::Io,
        }
    }

    pub(crate) fn format(message: impl Into<String>) -> Self {
        Self::FormatDetection {
            message: message.into(),
        }
    }

    pub(crate) fn destination(message: impl Into<String>) -> Self {
        Self::DestinationWrite {
            message: message.into(),
        }
    }
}

impl From<duckdb::Error> for LoadError {
    fn from(e: duckdb::Error) -> Self {
        Self::destination(e.to_string())
    }
}

impl From<csv::Error> for LoadError {
    fn from(e: csv::Error) -> Self {
        if e.is_io_error() {
            match e.into_kind() {
                csv::ErrorKind::Io(io) => Self::Io(io),
                other => Self::format(format!("{other:?}")),
            }
        } else {
            Self::format(format!("malformed delimited text: {e}"))
        }
    }
}
