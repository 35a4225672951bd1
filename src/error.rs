//! Error and warning types.
//!
//! Loading distinguishes two tiers of problems. Fatal problems are
//! reported through `Error` and abort a load without a result.
//! Non-fatal problems are reported as `ParseWarning`s alongside a
//! successful result.

use std::io;
use std::num::ParseFloatError;

use ndarray::ShapeError;
use thiserror::Error;

use crate::token::Token;

/// `Result` type alias for operations that can lead to fatal errors.
pub type Result<T> = ::std::result::Result<T, Error>;

/// Fatal errors in loading embeddings.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unsupported file format.
    #[error("Invalid file format: {0}")]
    Format(String),

    /// The source did not contain a single record.
    #[error("Embedding file is empty, cannot infer the dimensionality")]
    Empty,

    /// A record does not have the dimensionality of the first record.
    #[error("Line {line}: expected {expected} vector components, got {found}")]
    DimensionMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// A vector component is not a valid floating point literal.
    #[error("Line {line}: cannot parse vector component '{field}': {error}")]
    Component {
        line: usize,
        field: String,
        error: ParseFloatError,
    },

    /// A caller-supplied mapping points outside the output matrix.
    #[error("Row {row} of token '{token}' is out of bounds for a matrix with {rows} rows")]
    RowOutOfBounds { token: Token, row: usize, rows: usize },

    /// I/O error while reading.
    #[error("{desc}: {error}")]
    Read { desc: String, error: io::Error },

    /// `ndarray` shape error.
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// Data cannot be represented using the native word size.
    #[error("Data cannot be represented using native word size")]
    Overflow,

    /// The output matrix cannot be allocated.
    #[error("Cannot allocate a matrix of shape ({rows}, {cols})")]
    Allocation { rows: usize, cols: usize },

    /// Invalid loader configuration.
    #[error("Cannot parse loader configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// A warning that was escalated in strict mode.
    #[error(transparent)]
    Warning(#[from] ParseWarning),
}

impl Error {
    pub fn read_error(desc: impl Into<String>, error: io::Error) -> Self {
        Error::Read {
            desc: desc.into(),
            error,
        }
    }
}

/// Non-fatal findings collected during a load.
#[non_exhaustive]
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ParseWarning {
    /// A token occurred again after it was assigned an index.
    ///
    /// The token keeps the index of its first occurrence, its vector
    /// is replaced by the vector of this occurrence.
    #[error("Line {line}: duplicate token '{token}' overwrites the vector of index {index}")]
    DuplicateToken {
        token: Token,
        line: usize,
        index: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::{Error, ParseWarning};
    use crate::token::Token;

    #[test]
    fn warning_escalates_into_error() {
        let warning = ParseWarning::DuplicateToken {
            token: Token::from(","),
            line: 4,
            index: 1,
        };
        let err: Error = warning.clone().into();
        match err {
            Error::Warning(w) => assert_eq!(w, warning),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn dimension_mismatch_mentions_line() {
        let err = Error::DimensionMismatch {
            line: 2,
            expected: 4,
            found: 3,
        };
        assert_eq!(
            err.to_string(),
            "Line 2: expected 4 vector components, got 3"
        );
    }
}
