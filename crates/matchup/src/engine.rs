//! Per-interval matchup of a storm against along-track observations.
//!
//! Each pair of consecutive storm fixes walks a small state machine:
//!
//! ```text
//! NoCandidate ──► TemporallyChecked ──► SpatiallyChecked ──► Matched
//!      │                 │                     │
//!      └──── no brief ───┴──── no overlap ─────┴──► Unmatched(reason)
//! ```
//!
//! The temporal check asks the brief index for files overlapping the open
//! interval between the fixes. The spatial check compares every hourly box
//! around the interpolated centre with each candidate's extent. Hours that
//! pass are then resolved against the real track points: points within the
//! temporal tolerance of the hour and inside its box are square-averaged per
//! file, and slow or zero winds are discarded.

use std::collections::HashMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use sfmr::{SquareAverage, TrackBrief, TrackPoint, TrackSegmenter};
use tc_common::{BoundingBox, TimeRange};
use tracing::{debug, info, instrument};

use crate::config::MatchupConfig;
use crate::error::{MatchupError, Result};
use crate::fix::{interpolate_fixes, InterpolatedFix, StormFix};
use crate::records::MatchRecord;
use crate::sources::{BriefIndex, TrackLoader};

/// Why an interval ended without a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedReason {
    /// The fixes are less than one hour apart.
    EmptyInterval,
    NoTemporalOverlap,
    NoSpatialOverlap,
    /// Overlapping files held no usable observation near the storm.
    NoValidObservations,
}

/// Progress of one interval through the matchup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchState {
    NoCandidate,
    TemporallyChecked,
    SpatiallyChecked,
    Matched,
    Unmatched(UnmatchedReason),
}

impl MatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchState::Matched | MatchState::Unmatched(_))
    }
}

/// Square averages one file contributed to an hour.
#[derive(Debug, Clone, PartialEq)]
pub struct BriefAverages {
    pub brief: TrackBrief,
    pub averages: Vec<SquareAverage>,
}

/// Outcome for one interpolated hour.
#[derive(Debug, Clone, PartialEq)]
pub struct HourOutcome {
    pub fix: InterpolatedFix,
    pub area: BoundingBox,
    pub matched: bool,
    pub observations: Vec<BriefAverages>,
}

impl HourOutcome {
    fn unmatched(fix: InterpolatedFix, half_edge: f64) -> Self {
        let area = fix.area(half_edge);
        Self {
            fix,
            area,
            matched: false,
            observations: Vec::new(),
        }
    }
}

/// Outcome for one pair of consecutive fixes.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalOutcome {
    pub sid: String,
    pub range: TimeRange,
    /// Terminal state.
    pub state: MatchState,
    /// Every state visited, terminal state last.
    pub trace: Vec<MatchState>,
    pub hours: Vec<HourOutcome>,
}

impl IntervalOutcome {
    pub fn is_matched(&self) -> bool {
        self.state == MatchState::Matched
    }

    pub fn matched_hours(&self) -> usize {
        self.hours.iter().filter(|h| h.matched).count()
    }

    /// One record per hour of the interval.
    pub fn records(&self) -> Vec<MatchRecord> {
        let matched = self.is_matched();
        self.hours
            .iter()
            .map(|h| MatchRecord::new(&self.sid, h.fix.date_time, matched && h.matched))
            .collect()
    }
}

/// Matches storm intervals against a brief index and its tracks.
pub struct MatchupEngine<B, L> {
    config: MatchupConfig,
    briefs: B,
    tracks: L,
    segmenter: TrackSegmenter,
}

impl<B: BriefIndex, L: TrackLoader> MatchupEngine<B, L> {
    pub fn new(config: MatchupConfig, briefs: B, tracks: L) -> Self {
        let segmenter = TrackSegmenter::new(config.square_edge_deg);
        Self {
            config,
            briefs,
            tracks,
            segmenter,
        }
    }

    pub fn config(&self) -> &MatchupConfig {
        &self.config
    }

    /// Points of a track that belong to an hour: within the temporal
    /// tolerance of it and inside its box.
    fn points_in_hour(&self, points: &[TrackPoint], fix: &InterpolatedFix, area: &BoundingBox) -> Vec<TrackPoint> {
        let tolerance = Duration::minutes(self.config.temporal_tolerance_mins);
        points
            .iter()
            .filter(|p| {
                let offset = p.date_time - fix.date_time;
                offset >= -tolerance && offset < tolerance && area.contains_point_wrapped(p.lon, p.lat)
            })
            .copied()
            .collect()
    }

    /// Run the matchup for the interval between two fixes of one storm.
    #[instrument(skip(self, a, b), fields(sid = %a.sid, start = %a.date_time, end = %b.date_time))]
    pub async fn match_interval(&self, a: &StormFix, b: &StormFix) -> Result<IntervalOutcome> {
        if a.sid != b.sid {
            return Err(MatchupError::InvalidTrack {
                sid: a.sid.clone(),
                reason: format!("interval ends on a fix of {}", b.sid),
            });
        }

        let half_edge = self.config.half_regression_edge();
        let range = TimeRange::new(a.date_time, b.date_time);
        let fixes = interpolate_fixes(a, b, self.config.antimeridian_threshold_deg);
        let mut outcome = IntervalOutcome {
            sid: a.sid.clone(),
            range,
            state: MatchState::NoCandidate,
            trace: vec![MatchState::NoCandidate],
            hours: Vec::new(),
        };

        let finish = |mut outcome: IntervalOutcome, state: MatchState| {
            outcome.state = state;
            outcome.trace.push(state);
            outcome
        };
        let all_unmatched = |fixes: Vec<InterpolatedFix>| -> Vec<HourOutcome> {
            fixes
                .into_iter()
                .map(|f| HourOutcome::unmatched(f, half_edge))
                .collect()
        };

        if fixes.is_empty() {
            debug!("Fixes less than an hour apart");
            return Ok(finish(outcome, MatchState::Unmatched(UnmatchedReason::EmptyInterval)));
        }

        // Temporal check
        let candidates = self.briefs.overlapping(&range).await?;
        if candidates.is_empty() {
            debug!("No brief overlaps interval in time");
            outcome.hours = all_unmatched(fixes);
            return Ok(finish(outcome, MatchState::Unmatched(UnmatchedReason::NoTemporalOverlap)));
        }
        outcome.state = MatchState::TemporallyChecked;
        outcome.trace.push(MatchState::TemporallyChecked);

        // Spatial check, hour by hour
        let hour_candidates: Vec<Vec<&TrackBrief>> = fixes
            .iter()
            .map(|f| {
                let area = f.area(half_edge);
                candidates
                    .iter()
                    .filter(|b| area.overlaps_wrapped(&b.extent()))
                    .collect()
            })
            .collect();
        if hour_candidates.iter().all(Vec::is_empty) {
            debug!(candidates = candidates.len(), "No brief overlaps any hourly area");
            outcome.hours = all_unmatched(fixes);
            return Ok(finish(outcome, MatchState::Unmatched(UnmatchedReason::NoSpatialOverlap)));
        }
        outcome.state = MatchState::SpatiallyChecked;
        outcome.trace.push(MatchState::SpatiallyChecked);

        // Fine extraction against the actual track points
        let mut track_cache: HashMap<String, Vec<TrackPoint>> = HashMap::new();
        for (fix, briefs) in fixes.into_iter().zip(hour_candidates) {
            let area = fix.area(half_edge);
            let mut observations = Vec::new();

            for brief in briefs {
                let key = brief.key();
                if !track_cache.contains_key(&key) {
                    let points = self.tracks.load(brief).await?;
                    track_cache.insert(key.clone(), points);
                }
                let Some(points) = track_cache.get(&key) else {
                    continue;
                };

                let selected = self.points_in_hour(points, &fix, &area);
                if selected.is_empty() {
                    continue;
                }

                let averages: Vec<SquareAverage> = self
                    .segmenter
                    .average(&selected)
                    .into_iter()
                    .filter(|avg| self.config.keeps_windspd(avg.windspd()))
                    .collect();
                debug!(
                    hour = fix.hour,
                    file = %key,
                    points = selected.len(),
                    kept = averages.len(),
                    "Averaged track squares"
                );
                if !averages.is_empty() {
                    observations.push(BriefAverages {
                        brief: brief.clone(),
                        averages,
                    });
                }
            }

            outcome.hours.push(HourOutcome {
                matched: !observations.is_empty(),
                fix,
                area,
                observations,
            });
        }

        let state = if outcome.hours.iter().any(|h| h.matched) {
            MatchState::Matched
        } else {
            MatchState::Unmatched(UnmatchedReason::NoValidObservations)
        };
        debug!(?state, matched_hours = outcome.matched_hours(), "Interval finished");
        Ok(finish(outcome, state))
    }

    /// Match every consecutive pair of fixes of one storm.
    #[instrument(skip(self, fixes), fields(fixes = fixes.len()))]
    pub async fn match_storm(&self, fixes: &[StormFix]) -> Result<Vec<IntervalOutcome>> {
        let mut fixes = fixes.to_vec();
        fixes.sort_by_key(|f| f.date_time);

        let mut outcomes = Vec::with_capacity(fixes.len().saturating_sub(1));
        for pair in fixes.windows(2) {
            outcomes.push(self.match_interval(&pair[0], &pair[1]).await?);
        }

        if let Some(first) = fixes.first() {
            info!(
                sid = %first.sid,
                intervals = outcomes.len(),
                matched = outcomes.iter().filter(|o| o.is_matched()).count(),
                "Storm matched"
            );
        }
        Ok(outcomes)
    }
}
