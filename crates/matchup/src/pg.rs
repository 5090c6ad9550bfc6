//! PostgreSQL-backed fix source and brief index.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sfmr::TrackBrief;
use sqlx::PgPool;
use storage::{StorageError, SFMR_BRIEF_TABLE};
use tc_common::TimeRange;
use tracing::debug;

use crate::error::{MatchupError, Result};
use crate::fix::StormFix;
use crate::sources::{BriefIndex, FixSource};

/// Default table of IBTrACS storm positions.
pub const DEFAULT_FIX_TABLE: &str = "ibtracs_na";

fn query_failed(e: sqlx::Error) -> MatchupError {
    StorageError::DatabaseError(format!("Query failed: {}", e)).into()
}

/// Storm fixes read from an IBTrACS table with `sid`, `date_time`, `lon`
/// and `lat` columns.
pub struct PgFixSource {
    pool: PgPool,
    table: String,
}

impl PgFixSource {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(MatchupError::InvalidConfig(format!("invalid fix table name '{}'", table)));
        }
        Ok(Self { pool, table })
    }
}

#[async_trait]
impl FixSource for PgFixSource {
    async fn storms(&self, range: &TimeRange) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT DISTINCT sid FROM {} WHERE date_time >= $1 AND date_time <= $2 ORDER BY sid",
            self.table
        );
        let sids: Vec<(String,)> = sqlx::query_as(&sql)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed)?;

        Ok(sids.into_iter().map(|(sid,)| sid).collect())
    }

    async fn fixes(&self, sid: &str) -> Result<Vec<StormFix>> {
        let sql = format!(
            "SELECT sid, date_time, lon, lat FROM {} WHERE sid = $1 ORDER BY date_time",
            self.table
        );
        let rows: Vec<(String, DateTime<Utc>, f64, f64)> = sqlx::query_as(&sql)
            .bind(sid)
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed)?;

        debug!(sid, fixes = rows.len(), "Loaded storm fixes");
        Ok(rows
            .into_iter()
            .map(|(sid, date_time, lon, lat)| StormFix::new(sid, date_time, lon, lat))
            .collect())
    }
}

/// Brief index over the `sfmr_brief_info` table.
pub struct PgBriefIndex {
    pool: PgPool,
}

impl PgBriefIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BriefIndex for PgBriefIndex {
    async fn overlapping(&self, range: &TimeRange) -> Result<Vec<TrackBrief>> {
        let sql = format!(
            "SELECT hurricane, filename, start_datetime, end_datetime, min_lat, max_lat, min_lon, max_lon \
             FROM {} WHERE end_datetime > $1 AND start_datetime < $2 ORDER BY start_datetime",
            SFMR_BRIEF_TABLE
        );
        #[allow(clippy::type_complexity)]
        let rows: Vec<(String, String, DateTime<Utc>, DateTime<Utc>, f64, f64, f64, f64)> =
            sqlx::query_as(&sql)
                .bind(range.start)
                .bind(range.end)
                .fetch_all(&self.pool)
                .await
                .map_err(query_failed)?;

        Ok(rows
            .into_iter()
            .map(
                |(hurricane, filename, start, end, min_lat, max_lat, min_lon, max_lon)| TrackBrief {
                    hurricane,
                    filename,
                    start,
                    end,
                    min_lat,
                    max_lat,
                    min_lon,
                    max_lon,
                },
            )
            .collect())
    }
}
