//! Storage error types.

use thiserror::Error;

/// Errors raised by row stores and the bulk loader.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An existing table's shape differs from the expected schema.
    #[error("Schema mismatch for table {table}: {reason}")]
    SchemaMismatch { table: String, reason: String },

    /// A row does not fit its table's schema.
    #[error("Invalid row for table {table}: {reason}")]
    InvalidRow { table: String, reason: String },

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl StorageError {
    pub fn schema_mismatch(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            table: table.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_row(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRow {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Whether the caller may drop the offending row and carry on.
    ///
    /// Schema mismatches and database failures abort the whole job.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidRow { .. })
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
