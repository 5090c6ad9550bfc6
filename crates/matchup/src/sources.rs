//! Where storm fixes, SFMR briefs, tracks and raster fields come from.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::NaiveDate;
use grid_processor::RasterField;
use sfmr::{TrackBrief, TrackPoint};
use tc_common::TimeRange;

use crate::error::{MatchupError, Result};
use crate::fix::StormFix;

/// Recorded storm positions.
#[async_trait]
pub trait FixSource: Send + Sync {
    /// Ids of storms with at least one fix inside `range`.
    async fn storms(&self, range: &TimeRange) -> Result<Vec<String>>;

    /// All fixes of one storm, ordered by time.
    async fn fixes(&self, sid: &str) -> Result<Vec<StormFix>>;
}

/// Extent records of along-track files.
#[async_trait]
pub trait BriefIndex: Send + Sync {
    /// Briefs whose time span overlaps the open interval `range`.
    async fn overlapping(&self, range: &TimeRange) -> Result<Vec<TrackBrief>>;
}

/// Decoded track points of one along-track file.
#[async_trait]
pub trait TrackLoader: Send + Sync {
    async fn load(&self, brief: &TrackBrief) -> Result<Vec<TrackPoint>>;
}

/// Gridded fields valid at one hour of one day.
#[async_trait]
pub trait RasterSource: Send + Sync {
    /// Fields for `hour` on `day`; empty if none are available.
    async fn fields(&self, day: NaiveDate, hour: u32) -> Result<Vec<RasterField>>;
}

/// Fixes held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticFixSource {
    fixes: BTreeMap<String, Vec<StormFix>>,
}

impl StaticFixSource {
    pub fn new(fixes: impl IntoIterator<Item = StormFix>) -> Self {
        let mut map: BTreeMap<String, Vec<StormFix>> = BTreeMap::new();
        for fix in fixes {
            map.entry(fix.sid.clone()).or_default().push(fix);
        }
        for track in map.values_mut() {
            track.sort_by_key(|f| f.date_time);
        }
        Self { fixes: map }
    }
}

#[async_trait]
impl FixSource for StaticFixSource {
    async fn storms(&self, range: &TimeRange) -> Result<Vec<String>> {
        Ok(self
            .fixes
            .iter()
            .filter(|(_, track)| track.iter().any(|f| range.contains(&f.date_time)))
            .map(|(sid, _)| sid.clone())
            .collect())
    }

    async fn fixes(&self, sid: &str) -> Result<Vec<StormFix>> {
        Ok(self.fixes.get(sid).cloned().unwrap_or_default())
    }
}

/// Briefs held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticBriefIndex {
    briefs: Vec<TrackBrief>,
}

impl StaticBriefIndex {
    pub fn new(briefs: Vec<TrackBrief>) -> Self {
        Self { briefs }
    }
}

#[async_trait]
impl BriefIndex for StaticBriefIndex {
    async fn overlapping(&self, range: &TimeRange) -> Result<Vec<TrackBrief>> {
        Ok(self
            .briefs
            .iter()
            .filter(|b| range.overlaps(&b.time_range()))
            .cloned()
            .collect())
    }
}

/// Tracks held in memory, keyed by [`TrackBrief::key`].
#[derive(Debug, Clone, Default)]
pub struct StaticTrackLoader {
    tracks: HashMap<String, Vec<TrackPoint>>,
}

impl StaticTrackLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a track and return the brief describing it.
    pub fn insert(&mut self, hurricane: &str, filename: &str, points: Vec<TrackPoint>) -> Option<TrackBrief> {
        let brief = TrackBrief::from_points(hurricane, filename, &points)?;
        self.tracks.insert(brief.key(), points);
        Some(brief)
    }
}

#[async_trait]
impl TrackLoader for StaticTrackLoader {
    async fn load(&self, brief: &TrackBrief) -> Result<Vec<TrackPoint>> {
        self.tracks
            .get(&brief.key())
            .cloned()
            .ok_or_else(|| MatchupError::Source(format!("no track for {}", brief.key())))
    }
}

/// Raster fields held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticRasters {
    fields: HashMap<(NaiveDate, u32), Vec<RasterField>>,
}

impl StaticRasters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, day: NaiveDate, hour: u32, field: RasterField) {
        self.fields.entry((day, hour)).or_default().push(field);
    }
}

#[async_trait]
impl RasterSource for StaticRasters {
    async fn fields(&self, day: NaiveDate, hour: u32) -> Result<Vec<RasterField>> {
        Ok(self.fields.get(&(day, hour)).cloned().unwrap_or_default())
    }
}
