//! Row store backed by PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::query_builder::Separated;
use sqlx::{PgPool, Postgres, QueryBuilder, Row as _};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Result, StorageError};
use crate::schema::{ColumnType, SchemaRegistry, TableSchema};
use crate::store::{BatchOutcome, RowStore};
use crate::value::{Row, Value};

/// Double-quote an identifier; several ERA5 column names start with a digit.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Bind parameters PostgreSQL accepts in one statement.
const MAX_BIND_PARAMS: usize = 65535;

/// Rows of `columns` bound values that fit into one statement.
fn rows_per_statement(columns: usize) -> usize {
    (MAX_BIND_PARAMS / columns.max(1)).max(1)
}

fn push_value(sep: &mut Separated<'_, '_, Postgres, &'static str>, value: &Value, column_type: ColumnType) {
    match (value, column_type) {
        (Value::Integer(v), _) => sep.push_bind(*v),
        (Value::Float(v), _) => sep.push_bind(*v),
        (Value::Text(v), _) => sep.push_bind(v.clone()),
        (Value::Timestamp(v), _) => sep.push_bind(*v),
        (Value::Boolean(v), _) => sep.push_bind(*v),
        (Value::Null, ColumnType::Integer) => sep.push_bind(None::<i64>),
        (Value::Null, ColumnType::Float) => sep.push_bind(None::<f64>),
        (Value::Null, ColumnType::Text) => sep.push_bind(None::<String>),
        (Value::Null, ColumnType::Timestamp) => sep.push_bind(None::<DateTime<Utc>>),
        (Value::Null, ColumnType::Boolean) => sep.push_bind(None::<bool>),
    };
}

fn read_value(row: &PgRow, column: &str, column_type: ColumnType) -> Result<Value> {
    let value = match column_type {
        ColumnType::Integer => row.try_get::<Option<i64>, _>(column)?.into(),
        ColumnType::Float => row.try_get::<Option<f64>, _>(column)?.into(),
        ColumnType::Text => row.try_get::<Option<String>, _>(column)?.into(),
        ColumnType::Timestamp => row.try_get::<Option<DateTime<Utc>>, _>(column)?.into(),
        ColumnType::Boolean => row.try_get::<Option<bool>, _>(column)?.into(),
    };
    Ok(value)
}

/// PostgreSQL-backed [`RowStore`].
pub struct PgStore {
    pool: PgPool,
    registry: Mutex<SchemaRegistry>,
}

impl PgStore {
    /// Create a new store connection from database URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::DatabaseError(format!("Connection failed: {}", e)))?;

        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            registry: Mutex::new(SchemaRegistry::new()),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Shape of an existing table, or `None` if it does not exist.
    async fn existing_schema(&self, schema: &TableSchema) -> Result<Option<TableSchema>> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT column_name::text, data_type::text, is_nullable::text FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1 AND column_name <> 'key' \
             ORDER BY ordinal_position",
        )
        .bind(&schema.name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::DatabaseError(format!("Query failed: {}", e)))?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut found = TableSchema::new(&schema.name);
        for (name, data_type, is_nullable) in rows {
            let column_type = [
                ColumnType::Integer,
                ColumnType::Float,
                ColumnType::Text,
                ColumnType::Timestamp,
                ColumnType::Boolean,
            ]
            .into_iter()
            .find(|t| t.information_schema_type() == data_type)
            .ok_or_else(|| {
                StorageError::schema_mismatch(
                    &schema.name,
                    format!("column {} has unsupported type {}", name, data_type),
                )
            })?;
            found = if is_nullable == "YES" {
                found.nullable(name, column_type)
            } else {
                found.column(name, column_type)
            };
        }
        Ok(Some(found))
    }

    async fn create_table(&self, schema: &TableSchema) -> Result<()> {
        let mut columns = vec!["key BIGSERIAL PRIMARY KEY".to_string()];
        for def in &schema.columns {
            let mut col = format!("{} {}", quote_ident(&def.name), def.column_type.sql_type());
            if !def.nullable {
                col.push_str(" NOT NULL");
            }
            if schema.unique_key.contains(&def.name) {
                col.push_str(" UNIQUE");
            }
            columns.push(col);
        }

        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(&schema.name),
            columns.join(", ")
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(format!("Create table failed: {}", e)))?;

        info!(table = %schema.name, columns = schema.columns.len(), "Created table");
        Ok(())
    }
}

#[async_trait]
impl RowStore for PgStore {
    async fn ensure_table(&self, schema: &TableSchema) -> Result<()> {
        let mut registry = self.registry.lock().await;
        if registry.get(&schema.name).is_some() {
            registry.register(schema)?;
            return Ok(());
        }

        match self.existing_schema(schema).await? {
            Some(found) => {
                if let Some(reason) = schema.diff(&found) {
                    return Err(StorageError::schema_mismatch(&schema.name, reason));
                }
            }
            None => self.create_table(schema).await?,
        }

        registry.register(schema)?;
        Ok(())
    }

    async fn insert_new(&self, schema: &TableSchema, rows: Vec<Row>) -> Result<BatchOutcome> {
        if rows.is_empty() {
            return Ok(BatchOutcome::default());
        }
        for row in &rows {
            schema.validate_row(row)?;
        }

        let table = quote_ident(&schema.name);
        let key_types: Vec<ColumnType> = schema
            .unique_key
            .iter()
            .map(|k| {
                schema
                    .column_def(k)
                    .map(|d| d.column_type)
                    .ok_or_else(|| StorageError::schema_mismatch(&schema.name, format!("no key column {}", k)))
            })
            .collect::<Result<_>>()?;

        let mut tx = self.pool.begin().await?;

        // Keep other writers out between the key lookup and the insert.
        sqlx::query(&format!("LOCK TABLE {} IN SHARE ROW EXCLUSIVE MODE", table))
            .execute(&mut *tx)
            .await?;

        let mut existing = std::collections::HashSet::new();
        if !schema.unique_key.is_empty() {
            let key_list: Vec<String> = schema.unique_key.iter().map(|k| quote_ident(k)).collect();
            for chunk in rows.chunks(rows_per_statement(key_list.len())) {
                let mut query = QueryBuilder::<Postgres>::new(format!(
                    "SELECT {} FROM {} WHERE ({}) IN ",
                    key_list.join(", "),
                    table,
                    key_list.join(", ")
                ));
                query.push_tuples(chunk, |mut sep, row| {
                    for (k, t) in schema.unique_key.iter().zip(&key_types) {
                        push_value(&mut sep, row.value(k), *t);
                    }
                });

                for found in query.build().fetch_all(&mut *tx).await? {
                    let mut tuple = Vec::with_capacity(key_types.len());
                    for (k, t) in schema.unique_key.iter().zip(&key_types) {
                        tuple.push(read_value(&found, k, *t)?.key_text());
                    }
                    existing.insert(tuple);
                }
            }
        }

        let (fresh, stale): (Vec<Row>, Vec<Row>) = rows
            .into_iter()
            .partition(|r| !existing.contains(&r.key_tuple(&schema.unique_key)));

        if !fresh.is_empty() {
            let column_list: Vec<String> = schema.column_names().map(quote_ident).collect();
            for chunk in fresh.chunks(rows_per_statement(column_list.len())) {
                let mut query = QueryBuilder::<Postgres>::new(format!(
                    "INSERT INTO {} ({}) ",
                    table,
                    column_list.join(", ")
                ));
                query.push_values(chunk, |mut sep, row| {
                    for def in &schema.columns {
                        push_value(&mut sep, row.value(&def.name), def.column_type);
                    }
                });
                query.build().execute(&mut *tx).await?;
            }
        }

        tx.commit().await?;

        debug!(table = %schema.name, inserted = fresh.len(), existing = stale.len(), "Committed batch");
        Ok(BatchOutcome {
            inserted: fresh.len(),
            skipped_existing: stale.len(),
        })
    }

    async fn fetch_all(&self, schema: &TableSchema) -> Result<Vec<Row>> {
        let column_list: Vec<String> = schema.column_names().map(quote_ident).collect();
        let sql = format!(
            "SELECT {} FROM {} ORDER BY key",
            column_list.join(", "),
            quote_ident(&schema.name)
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(format!("Query failed: {}", e)))?;

        rows.iter()
            .map(|pg_row| {
                let mut row = Row::new();
                for def in &schema.columns {
                    row.set(&def.name, read_value(pg_row, &def.name, def.column_type)?);
                }
                Ok(row)
            })
            .collect()
    }
}
