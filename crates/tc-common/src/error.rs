//! Error types shared by the grid and time utilities.

use thiserror::Error;

/// Result type alias using TcError.
pub type TcResult<T> = Result<T, TcError>;

/// Primary error type for grid indexing and windowing.
#[derive(Debug, Error)]
pub enum TcError {
    // === Recoverable: caller skips the record or hour ===
    #[error("Invalid window around ({lat}, {lon}): {reason}")]
    InvalidWindow { lat: f64, lon: f64, reason: String },

    // === Fatal ===
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Empty grid axis: {0}")]
    EmptyAxis(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),
}

impl TcError {
    pub fn invalid_window(lat: f64, lon: f64, reason: impl Into<String>) -> Self {
        Self::InvalidWindow {
            lat,
            lon,
            reason: reason.into(),
        }
    }

    /// Whether the caller should skip the offending record and carry on.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TcError::InvalidWindow { .. })
    }
}
