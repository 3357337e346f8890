//! Error types for the numerical utilities.

use thiserror::Error;
use tlm_core::TlmError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UtilError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Matrix is singular")]
    Singular,

    #[error("Even after sorting, the {what} is still not strictly increasing")]
    NotStrictlyIncreasing { what: &'static str },

    #[error("Could not parse \"{field}\" on line {line}")]
    Parse { line: usize, field: String },

    #[error("Column {column} is missing on data row {row}")]
    MissingColumn { column: usize, row: usize },

    #[error("Could not read {path}: {message}")]
    Io { path: String, message: String },
}

pub type UtilResult<T> = Result<T, UtilError>;

impl From<UtilError> for TlmError {
    fn from(e: UtilError) -> Self {
        match e {
            UtilError::InvalidArg { what } => TlmError::InvalidArg { what },
            UtilError::DimensionMismatch { what, .. } => TlmError::InvalidArg { what },
            UtilError::Singular => TlmError::Invariant {
                what: "matrix is singular".to_string(),
            },
            other => TlmError::Invariant {
                what: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_conversion() {
        let err = UtilError::InvalidArg { what: "delay steps" };
        assert!(err.to_string().contains("delay steps"));
        let tlm: TlmError = err.into();
        assert!(matches!(tlm, TlmError::InvalidArg { .. }));
    }
}
