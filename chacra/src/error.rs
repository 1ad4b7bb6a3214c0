//! Error handling.

use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;

use displaydoc::Display;

pub type ChacraResult<T> = Result<T, ChacraError>;

/// An error.
#[derive(Debug, Display)]
pub enum ChacraError {
    /// Invalid binary field "{field}": {reason}
    InvalidBinaryField {
        field: &'static str,
        reason: &'static str,
    },

    /// Cannot read artifact file {path:?}: {error}
    FileUnreadable { path: PathBuf, error: io::Error },
}

impl ChacraError {
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidBinaryField { .. } => "InvalidBinaryField",
            Self::FileUnreadable { .. } => "FileUnreadable",
        }
    }

    /// Returns whether the error was caused by invalid caller input.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::InvalidBinaryField { .. })
    }
}

impl StdError for ChacraError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::FileUnreadable { error, .. } => Some(error),
            _ => None,
        }
    }
}
