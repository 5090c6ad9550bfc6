//! Deduplicating bulk loader.
//!
//! Rows are written in fixed-size batches. Inside a batch, two rows count as
//! duplicates when *any single* unique-key field is equal, and the first one
//! wins. Rows whose full key tuple already exists in the store are skipped
//! by the store itself. Re-running a load is therefore idempotent.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::schema::TableSchema;
use crate::store::RowStore;
use crate::value::Row;

/// Default number of rows per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Counters for one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub batches: usize,
    pub inserted: usize,
    /// Rows sharing a unique-key field with an earlier row of their batch.
    pub skipped_in_batch: usize,
    /// Rows whose key tuple was already stored.
    pub skipped_existing: usize,
}

impl LoadReport {
    /// Rows handed to the loader.
    pub fn total(&self) -> usize {
        self.inserted + self.skipped_in_batch + self.skipped_existing
    }
}

/// Remove rows sharing any unique-key field value with an earlier row.
///
/// Returns the surviving rows and the number removed.
pub fn dedup_batch(rows: Vec<Row>, unique_key: &[String]) -> (Vec<Row>, usize) {
    let mut seen: Vec<HashSet<String>> = vec![HashSet::new(); unique_key.len()];
    let mut kept = Vec::with_capacity(rows.len());
    let mut removed = 0;

    for row in rows {
        let values: Vec<String> = unique_key.iter().map(|f| row.value(f).key_text()).collect();
        let duplicate = values.iter().zip(&seen).any(|(v, s)| s.contains(v));
        if duplicate {
            removed += 1;
            continue;
        }
        for (v, s) in values.into_iter().zip(seen.iter_mut()) {
            s.insert(v);
        }
        kept.push(row);
    }

    (kept, removed)
}

/// Writes rows into a [`RowStore`] batch by batch.
pub struct BulkLoader<'a, S: RowStore + ?Sized> {
    store: &'a S,
    batch_size: usize,
}

impl<'a, S: RowStore + ?Sized> BulkLoader<'a, S> {
    pub fn new(store: &'a S, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Create the table if needed and insert every new row.
    pub async fn load(&self, schema: &TableSchema, rows: Vec<Row>) -> Result<LoadReport> {
        self.store.ensure_table(schema).await?;

        let mut report = LoadReport::default();
        let mut rows = rows.into_iter().peekable();

        while rows.peek().is_some() {
            let batch: Vec<Row> = rows.by_ref().take(self.batch_size).collect();
            let (batch, removed) = dedup_batch(batch, &schema.unique_key);
            let outcome = self.store.insert_new(schema, batch).await?;

            report.batches += 1;
            report.skipped_in_batch += removed;
            report.inserted += outcome.inserted;
            report.skipped_existing += outcome.skipped_existing;

            debug!(
                table = %schema.name,
                batch = report.batches,
                inserted = outcome.inserted,
                skipped_in_batch = removed,
                skipped_existing = outcome.skipped_existing,
                "Inserted batch"
            );
        }

        info!(
            table = %schema.name,
            inserted = report.inserted,
            skipped = report.skipped_in_batch + report.skipped_existing,
            "Load complete"
        );
        Ok(report)
    }
}
