//! Persisted match and brief records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sfmr::TrackBrief;
use storage::Row;

/// Timestamp format used inside composite key strings.
pub const KEY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Whether a storm had matching observations at one hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub sid: String,
    pub date_time: DateTime<Utc>,
    pub matched: bool,
}

impl MatchRecord {
    pub fn new(sid: impl Into<String>, date_time: DateTime<Utc>, matched: bool) -> Self {
        Self {
            sid: sid.into(),
            date_time,
            matched,
        }
    }

    /// Composite unique key, `{sid}_{date_time}`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.sid, self.date_time.format(KEY_TIME_FORMAT))
    }

    pub fn to_row(&self) -> Row {
        Row::new()
            .with("tc_sid", self.sid.as_str())
            .with("date_time", self.date_time)
            .with("match", self.matched)
            .with("tc_sid_datetime", self.key())
    }
}

/// Row of the SFMR brief-index table.
pub fn brief_row(brief: &TrackBrief) -> Row {
    Row::new()
        .with("hurricane", brief.hurricane.as_str())
        .with("filename", brief.filename.as_str())
        .with("start_datetime", brief.start)
        .with("end_datetime", brief.end)
        .with("min_lat", brief.min_lat)
        .with("max_lat", brief.max_lat)
        .with("min_lon", brief.min_lon)
        .with("max_lon", brief.max_lon)
        .with("hurricane_filename", brief.key())
}

/// Inverse of [`brief_row`].
pub fn brief_from_row(row: &Row) -> Option<TrackBrief> {
    Some(TrackBrief {
        hurricane: row.value("hurricane").as_str()?.to_string(),
        filename: row.value("filename").as_str()?.to_string(),
        start: row.value("start_datetime").as_timestamp()?,
        end: row.value("end_datetime").as_timestamp()?,
        min_lat: row.value("min_lat").as_f64()?,
        max_lat: row.value("max_lat").as_f64()?,
        min_lon: row.value("min_lon").as_f64()?,
        max_lon: row.value("max_lon").as_f64()?,
    })
}
