//! Error types for the matchup crate.

use grid_processor::GridProcessorError;
use sfmr::SfmrError;
use storage::StorageError;
use tc_common::TcError;
use thiserror::Error;

/// Errors that can occur while matching storms against sources.
///
/// Missing temporal or spatial overlap is not an error; it ends an interval
/// in [`crate::MatchState::Unmatched`].
#[derive(Error, Debug)]
pub enum MatchupError {
    #[error(transparent)]
    Grid(#[from] TcError),

    #[error(transparent)]
    Raster(#[from] GridProcessorError),

    #[error(transparent)]
    Sfmr(#[from] SfmrError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid storm track {sid}: {reason}")]
    InvalidTrack { sid: String, reason: String },

    #[error("Source unavailable: {0}")]
    Source(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MatchupError {
    /// Whether the current record or hour can be skipped and the run continued.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Grid(e) => e.is_recoverable(),
            Self::Raster(e) => e.is_recoverable(),
            Self::Storage(e) => e.is_recoverable(),
            Self::Sfmr(_) | Self::InvalidTrack { .. } | Self::Source(_) | Self::InvalidConfig(_) => {
                false
            }
        }
    }
}

impl From<sqlx::Error> for MatchupError {
    fn from(e: sqlx::Error) -> Self {
        Self::Storage(StorageError::from(e))
    }
}

/// Result type for matchup operations.
pub type Result<T> = std::result::Result<T, MatchupError>;
