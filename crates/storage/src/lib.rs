//! Storage for aligned feature tables.
//!
//! Provides:
//! - A typed [`Row`]/[`Value`] record abstraction
//! - Fixed table layouts per [`SourceKind`] and a first-writer-wins
//!   [`SchemaRegistry`]
//! - The [`RowStore`] trait with in-memory and PostgreSQL implementations
//! - A deduplicating [`BulkLoader`]

pub mod catalog;
pub mod error;
pub mod loader;
pub mod schema;
pub mod store;
pub mod value;

pub use catalog::PgStore;
pub use error::{Result, StorageError};
pub use loader::{dedup_batch, BulkLoader, LoadReport, DEFAULT_BATCH_SIZE};
pub use schema::{
    feature_schema, feature_table_name, match_schema, match_table_name, sfmr_brief_schema,
    ColumnDef, ColumnType, SchemaRegistry, SourceKind, TableSchema,
    ERA5_PRESSURE_LEVEL_FIELDS, ERA5_SINGLE_LEVEL_FIELDS, SFMR_BRIEF_TABLE, SFMR_QUANTITY_FIELDS,
};
pub use store::{BatchOutcome, MemoryStore, RowStore};
pub use value::{Row, Value};
