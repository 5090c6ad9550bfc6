//! Error types for grid processing.

use tc_common::TcError;
use thiserror::Error;

/// Errors that can occur while resolving or sharpening raster values.
#[derive(Error, Debug)]
pub enum GridProcessorError {
    /// The lookup window falls off the grid, crosses a pole or wraps ambiguously.
    #[error("invalid window at ({lat}, {lon}): {reason}")]
    InvalidWindow { lat: f64, lon: f64, reason: String },

    /// The neighbourhood handed to the resolver is not a usable 2×2 square.
    #[error("not a valid interpolation square: {0}")]
    InvalidInterpolationSquare(String),

    /// A corner of the cell around the target is masked.
    #[error("cell around ({lat}, {lon}) touches masked data")]
    MaskedData { lat: f64, lon: f64 },

    /// Data, mask and axes disagree in size.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Invalid grid metadata.
    #[error("invalid grid metadata: {0}")]
    InvalidMetadata(String),
}

impl GridProcessorError {
    /// Create an InvalidInterpolationSquare error.
    pub fn invalid_square(msg: impl Into<String>) -> Self {
        Self::InvalidInterpolationSquare(msg.into())
    }

    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(msg: impl Into<String>) -> Self {
        Self::ShapeMismatch(msg.into())
    }

    /// Window, square and mask problems only exclude the affected row.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidWindow { .. } | Self::InvalidInterpolationSquare(_) | Self::MaskedData { .. }
        )
    }
}

impl From<TcError> for GridProcessorError {
    fn from(err: TcError) -> Self {
        match err {
            TcError::InvalidWindow { lat, lon, reason } => Self::InvalidWindow { lat, lon, reason },
            other => Self::InvalidMetadata(other.to_string()),
        }
    }
}

/// Result type for grid processor operations.
pub type Result<T> = std::result::Result<T, GridProcessorError>;
