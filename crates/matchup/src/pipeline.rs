//! End-to-end storm run: match, persist outcomes, build and load features.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use sfmr::TrackBrief;
use storage::{
    feature_schema, match_schema, sfmr_brief_schema, BulkLoader, LoadReport, RowStore, SourceKind,
};
use tc_common::{grids, round_to_hour};
use tracing::{info, instrument, warn};

use crate::engine::MatchupEngine;
use crate::error::Result;
use crate::features::{
    attach_pressure_levels, attach_single_levels, sfmr_feature_rows, AlignedFeatureRow,
    RasterAttachment,
};
use crate::fix::StormFix;
use crate::records::brief_row;
use crate::sources::{BriefIndex, RasterSource, TrackLoader};

/// Name of the storm-track source in match-table names.
pub const STORM_SOURCE: &str = "ibtracs";

/// Totals of one raster attachment run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttachSummary {
    pub attached: usize,
    pub dropped_masked: usize,
    pub dropped_invalid: usize,
    pub dropped_no_raster: usize,
}

/// What a storm run produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StormReport {
    pub sid: String,
    pub intervals: usize,
    pub matched_intervals: usize,
    pub matched_hours: usize,
    pub match_load: LoadReport,
    pub feature_rows: usize,
    pub attach: Option<AttachSummary>,
    pub feature_load: LoadReport,
}

/// Persist the brief of every SFMR file into the brief-index table.
pub async fn index_briefs<S: RowStore + ?Sized>(
    store: &S,
    briefs: &[TrackBrief],
    batch_size: usize,
) -> Result<LoadReport> {
    let rows = briefs.iter().map(brief_row).collect();
    let report = BulkLoader::new(store, batch_size)
        .load(&sfmr_brief_schema(), rows)
        .await?;
    Ok(report)
}

/// Attach ERA5 fields day by day, in both passes.
pub async fn attach_rasters<R: RasterSource + ?Sized>(
    rows: Vec<AlignedFeatureRow>,
    rasters: &R,
    pressure_levels: &[u32],
) -> Result<(Vec<AlignedFeatureRow>, AttachSummary)> {
    let mut by_day: BTreeMap<NaiveDate, Vec<AlignedFeatureRow>> = BTreeMap::new();
    for row in rows {
        by_day
            .entry(round_to_hour(row.obs_time).date_naive())
            .or_default()
            .push(row);
    }

    let mut summary = AttachSummary::default();
    let mut attached = Vec::new();
    for (day, rows) in by_day {
        let Some(source) = rows.first().map(|r| r.source.clone()) else {
            continue;
        };
        let attachment = RasterAttachment::for_source(&source);

        let single = attach_single_levels(rows, day, rasters, attachment).await?;
        if !single.deferred.is_empty() {
            warn!(%day, rows = single.deferred.len(), "Rows rounded onto another day");
        }
        summary.dropped_masked += single.dropped_masked;
        summary.dropped_invalid += single.dropped_invalid;
        summary.dropped_no_raster += single.dropped_no_raster + single.deferred.len();

        let pressure = attach_pressure_levels(single.rows, day, rasters, attachment, pressure_levels).await?;
        summary.dropped_masked += pressure.dropped_masked;
        summary.dropped_invalid += pressure.dropped_invalid;
        summary.dropped_no_raster += pressure.dropped_no_raster + pressure.deferred.len();
        attached.extend(pressure.rows);
    }

    summary.attached = attached.len();
    Ok((attached, summary))
}

/// Run one storm through the matchup and persist what it yields.
///
/// Match outcomes go to the `ibtracs`/`sfmr` match table. Square averages of
/// matched hours become SFMR feature rows; with `rasters` they are aligned
/// with ERA5 first and rows that cannot be aligned are left out.
#[instrument(skip_all, fields(fixes = fixes.len()))]
pub async fn run_storm<B, L, S>(
    engine: &MatchupEngine<B, L>,
    store: &S,
    fixes: &[StormFix],
    rasters: Option<&dyn RasterSource>,
) -> Result<StormReport>
where
    B: BriefIndex,
    L: TrackLoader,
    S: RowStore + ?Sized,
{
    let config = engine.config();
    let loader = BulkLoader::new(store, config.insert_batch_size);
    let outcomes = engine.match_storm(fixes).await?;

    let mut report = StormReport {
        sid: fixes.first().map(|f| f.sid.clone()).unwrap_or_default(),
        intervals: outcomes.len(),
        matched_intervals: outcomes.iter().filter(|o| o.is_matched()).count(),
        matched_hours: outcomes.iter().map(|o| o.matched_hours()).sum(),
        ..Default::default()
    };

    let records = outcomes
        .iter()
        .flat_map(|o| o.records())
        .map(|r| r.to_row())
        .collect();
    let schema = match_schema(STORM_SOURCE, SourceKind::Sfmr.name(), &config.basin);
    report.match_load = loader.load(&schema, records).await?;

    let step = grids::era5_0p25().resolution();
    let mut rows: Vec<AlignedFeatureRow> = sfmr_feature_rows(&outcomes, step, config.antimeridian_threshold_deg)
        .into_iter()
        .map(|r| r.at_10m(config.sfmr_wind_height_m))
        .collect();
    if let Some(rasters) = rasters {
        let (attached, summary) = attach_rasters(rows, rasters, &config.pressure_levels).await?;
        rows = attached;
        report.attach = Some(summary);
    }
    report.feature_rows = rows.len();

    let schema = feature_schema(&SourceKind::Sfmr, &config.basin)?;
    report.feature_load = loader
        .load(&schema, rows.iter().map(|r| r.to_row()).collect())
        .await?;

    info!(
        sid = %report.sid,
        intervals = report.intervals,
        matched_hours = report.matched_hours,
        features = report.feature_rows,
        inserted = report.feature_load.inserted,
        "Storm run finished"
    );
    Ok(report)
}
