//! Row store abstraction and the in-memory implementation.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{Result, StorageError};
use crate::schema::{SchemaRegistry, TableSchema};
use crate::value::Row;

/// Outcome of inserting one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub inserted: usize,
    /// Rows whose full key tuple already existed in the table.
    pub skipped_existing: usize,
}

/// A relational store of typed rows.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Create the table if it does not exist, or check that it has the
    /// expected shape if it does.
    async fn ensure_table(&self, schema: &TableSchema) -> Result<()>;

    /// Insert the rows whose unique-key tuple is not already stored.
    ///
    /// The existence check and the insert observe the same table state.
    async fn insert_new(&self, schema: &TableSchema, rows: Vec<Row>) -> Result<BatchOutcome>;

    /// Every stored row of a table, in insertion order.
    async fn fetch_all(&self, schema: &TableSchema) -> Result<Vec<Row>>;
}

/// A [`RowStore`] held in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryTables>,
}

#[derive(Debug, Default)]
struct MemoryTables {
    registry: SchemaRegistry,
    rows: HashMap<String, Vec<Row>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows stored in a table.
    pub async fn row_count(&self, table: &str) -> usize {
        let inner = self.inner.lock().await;
        inner.rows.get(table).map(Vec::len).unwrap_or(0)
    }
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn ensure_table(&self, schema: &TableSchema) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.registry.register(schema)?;
        inner.rows.entry(schema.name.clone()).or_default();
        Ok(())
    }

    async fn insert_new(&self, schema: &TableSchema, rows: Vec<Row>) -> Result<BatchOutcome> {
        let mut inner = self.inner.lock().await;
        if inner.registry.get(&schema.name).is_none() {
            return Err(StorageError::UnknownTable(schema.name.clone()));
        }
        for row in &rows {
            schema.validate_row(row)?;
        }

        let table = inner.rows.entry(schema.name.clone()).or_default();
        let existing: HashSet<Vec<String>> = table
            .iter()
            .map(|r| r.key_tuple(&schema.unique_key))
            .collect();

        let mut outcome = BatchOutcome::default();
        for row in rows {
            if existing.contains(&row.key_tuple(&schema.unique_key)) {
                outcome.skipped_existing += 1;
            } else {
                table.push(row);
                outcome.inserted += 1;
            }
        }
        Ok(outcome)
    }

    async fn fetch_all(&self, schema: &TableSchema) -> Result<Vec<Row>> {
        let inner = self.inner.lock().await;
        inner
            .rows
            .get(&schema.name)
            .cloned()
            .ok_or_else(|| StorageError::UnknownTable(schema.name.clone()))
    }
}
