//! Error types for SFMR decoding.

use thiserror::Error;

/// Errors raised while decoding or reading SFMR files.
///
/// All of these abort the enclosing file: a partially decoded track would
/// misalign every square average built from it.
#[derive(Debug, Error)]
pub enum SfmrError {
    #[error("{file}: record {index}: {message}")]
    Parse {
        file: String,
        index: usize,
        message: String,
    },

    #[error("{file}: variable {variable} has {found} values, expected {expected}")]
    Shape {
        file: String,
        variable: String,
        expected: usize,
        found: usize,
    },

    #[error("{file}: missing variable {variable}")]
    MissingVariable { file: String, variable: String },

    #[error("{file}: cannot read: {message}")]
    Read { file: String, message: String },
}

impl SfmrError {
    pub fn parse(file: impl Into<String>, index: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            index,
            message: message.into(),
        }
    }

    /// The file the error refers to.
    pub fn file(&self) -> &str {
        match self {
            Self::Parse { file, .. }
            | Self::Shape { file, .. }
            | Self::MissingVariable { file, .. }
            | Self::Read { file, .. } => file,
        }
    }
}

/// Result type for SFMR operations.
pub type Result<T> = std::result::Result<T, SfmrError>;
