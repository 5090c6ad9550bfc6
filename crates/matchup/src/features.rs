//! Aligned feature rows and raster attachment.
//!
//! A feature row pairs one observation near a storm centre with ERA5 values
//! at the same place and hour. Rasters are attached in two passes: first the
//! single-level fields, then the pressure-level fields at the level nearest
//! to each row's mean-sea-level pressure. Rows whose cell touches masked data
//! are dropped, never interpolated.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use grid_processor::{resolve, CellLookup, CellMethod, GridProcessorError, RasterField};
use serde::{Deserialize, Serialize};
use sfmr::{Quantity, SquareAverage};
use storage::{Row, SourceKind, ERA5_PRESSURE_LEVEL_FIELDS, ERA5_SINGLE_LEVEL_FIELDS};
use tc_common::{
    bucket_by_hour_on, compose_wind, convert_to_10m, decompose_wind, minutes_from_hour, nearest_index,
    WindConvention,
};
use tracing::debug;

use crate::engine::IntervalOutcome;
use crate::error::Result;
use crate::fix::InterpolatedFix;
use crate::records::KEY_TIME_FORMAT;
use crate::sources::RasterSource;

const MSL_FIELD: &str = "mean_sea_level_pressure";
const NEUTRAL_U_FIELD: &str = "neutral_wind_at_10_m_u_component";
const NEUTRAL_V_FIELD: &str = "neutral_wind_at_10_m_v_component";

/// East and north offsets of `target` from `center` in whole grid cells.
///
/// Longitudes more than `threshold` apart are taken to straddle 0/360.
pub fn offset_in_cells(center: (f64, f64), target: (f64, f64), step: f64, threshold: f64) -> (i64, i64) {
    let mut dlon = target.0 - center.0;
    if dlon.abs() > threshold {
        dlon += if dlon < 0.0 { 360.0 } else { -360.0 };
    }
    let dlat = target.1 - center.1;
    ((dlon / step).round() as i64, (dlat / step).round() as i64)
}

/// Pressure level (hPa) nearest to a mean-sea-level pressure in Pa.
pub fn select_pressure_level(msl_pa: f64, candidates: &[u32]) -> Option<u32> {
    let levels: Vec<f64> = candidates.iter().map(|l| *l as f64).collect();
    nearest_index(msl_pa / 100.0, &levels).map(|(_, i)| candidates[i])
}

/// One observation aligned with a storm centre and, once attached, ERA5.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedFeatureRow {
    pub source: SourceKind,
    pub sid: String,
    pub obs_time: DateTime<Utc>,
    pub lon: f64,
    pub lat: f64,
    pub east_shift: i64,
    pub north_shift: i64,
    /// Values measured by the source, keyed by column name.
    pub observations: BTreeMap<String, f64>,
    pub raster_time: Option<DateTime<Utc>>,
    /// Observation time minus raster time, in whole minutes.
    pub diff_mins: Option<i64>,
    pub single_levels: BTreeMap<String, f64>,
    pub pres_lvl: Option<u32>,
    pub pressure_levels: BTreeMap<String, f64>,
    pub era5_windspd: Option<f64>,
    pub era5_winddir: Option<f64>,
}

impl AlignedFeatureRow {
    /// Feature row of one SFMR square average near an interpolated centre.
    pub fn from_sfmr(fix: &InterpolatedFix, avg: &SquareAverage, cell_step: f64, threshold: f64) -> Self {
        let (east_shift, north_shift) = offset_in_cells((fix.lon, fix.lat), (avg.lon, avg.lat), cell_step, threshold);
        let observations = Quantity::ALL
            .iter()
            .map(|q| (q.name().to_string(), avg.quantities[*q]))
            .collect();

        Self {
            source: SourceKind::Sfmr,
            sid: fix.sid.clone(),
            obs_time: avg.date_time,
            lon: avg.lon,
            lat: avg.lat,
            east_shift,
            north_shift,
            observations,
            raster_time: None,
            diff_mins: None,
            single_levels: BTreeMap::new(),
            pres_lvl: None,
            pressure_levels: BTreeMap::new(),
            era5_windspd: None,
            era5_winddir: None,
        }
    }

    /// Bring the observed wind speed from `height_m` above the sea to 10 m.
    pub fn at_10m(mut self, height_m: f64) -> Self {
        if let Some(speed) = self.observations.get_mut(Quantity::WindSpeed.name()) {
            *speed = convert_to_10m(*speed, height_m);
        }
        self
    }

    /// Composite unique key, `{time}_{lon}_{lat}`.
    pub fn key(&self) -> String {
        format!(
            "{}_{}_{}",
            self.obs_time.format(&format!("{}%.6f", KEY_TIME_FORMAT)),
            self.lon,
            self.lat
        )
    }

    pub fn to_row(&self) -> Row {
        let mut row = Row::new()
            .with("sid", self.sid.as_str())
            .with(self.source.datetime_column(), self.obs_time)
            .with("era5_datetime", self.raster_time)
            .with("east_shift_from_center", self.east_shift)
            .with("north_shift_from_center", self.north_shift)
            .with("lon", self.lon)
            .with("lat", self.lat)
            .with(self.source.diff_mins_column(), self.diff_mins)
            .with("pres_lvl", self.pres_lvl)
            .with("era5_10m_neutral_equivalent_windspd", self.era5_windspd)
            .with("era5_10m_neutral_equivalent_winddir", self.era5_winddir)
            .with(self.source.key_column(), self.key());

        for (name, value) in self.observations.iter().chain(&self.single_levels).chain(&self.pressure_levels) {
            row.set(name.as_str(), *value);
        }
        row
    }

    /// Neutral 10 m ERA5 wind from its u/v components, and observed u/v
    /// components for sources that only measure speed.
    pub fn derive_winds(&mut self) {
        let (Some(u), Some(v)) = (
            self.single_levels.get(NEUTRAL_U_FIELD),
            self.single_levels.get(NEUTRAL_V_FIELD),
        ) else {
            return;
        };
        let (speed, dir) = compose_wind(*u, *v, WindConvention::Oceanographic);
        self.era5_windspd = Some(speed);
        self.era5_winddir = Some(dir);

        let prefix = match self.source {
            SourceKind::Smap => "smap",
            SourceKind::Ccmp => "ccmp",
            _ => return,
        };
        if let Some(observed) = self.observations.get(&format!("{}_windspd", prefix)).copied() {
            let (ou, ov) = decompose_wind(observed, dir, WindConvention::Oceanographic);
            self.observations.insert(format!("{}_u_wind", prefix), ou);
            self.observations.insert(format!("{}_v_wind", prefix), ov);
        }
    }
}

/// Feature rows for every matched hour of the given intervals.
pub fn sfmr_feature_rows(outcomes: &[IntervalOutcome], cell_step: f64, threshold: f64) -> Vec<AlignedFeatureRow> {
    outcomes
        .iter()
        .filter(|o| o.is_matched())
        .flat_map(|o| o.hours.iter().filter(|h| h.matched))
        .flat_map(|h| {
            h.observations.iter().flat_map(move |obs| {
                obs.averages
                    .iter()
                    .map(move |avg| AlignedFeatureRow::from_sfmr(&h.fix, avg, cell_step, threshold))
            })
        })
        .collect()
}

/// How raster values are taken at a source's observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterAttachment {
    /// Along-track points, interpolated inside their enclosing cell.
    Interpolated,
    /// Centres of 0.25° gridded cells. On a 0.25° raster they coincide with
    /// a raster cell centre and take its corner mean; coarser rasters are
    /// interpolated inside the enclosing cell.
    CellCentres,
}

impl RasterAttachment {
    pub fn for_source(source: &SourceKind) -> Self {
        match source {
            SourceKind::Sfmr | SourceKind::Era5Single | SourceKind::Era5Pressure => Self::Interpolated,
            SourceKind::RssSatellite { .. } | SourceKind::Smap | SourceKind::Ccmp => Self::CellCentres,
        }
    }

    /// Cell lookup and method for one field.
    pub fn placement(&self, field: &RasterField) -> (CellLookup, CellMethod) {
        let resolution = field.grid.spec.resolution();
        match (self, CellMethod::select(resolution)) {
            (Self::CellCentres, CellMethod::AreaMean) => (
                CellLookup::Centered {
                    half_step: resolution / 2.0,
                },
                CellMethod::AreaMean,
            ),
            _ => (CellLookup::Enclosing, CellMethod::Bilinear),
        }
    }

    fn value(&self, field: &RasterField, lat: f64, lon: f64) -> grid_processor::Result<f64> {
        let (lookup, method) = self.placement(field);
        resolve(&field.grid, lat, lon, lookup, method)
    }
}

/// Rows after one attachment pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachOutcome {
    pub rows: Vec<AlignedFeatureRow>,
    /// Rows whose rounded hour falls on another day.
    pub deferred: Vec<AlignedFeatureRow>,
    pub dropped_masked: usize,
    pub dropped_invalid: usize,
    pub dropped_no_raster: usize,
}

impl AttachOutcome {
    pub fn dropped(&self) -> usize {
        self.dropped_masked + self.dropped_invalid + self.dropped_no_raster
    }

    fn drop_for(&mut self, err: &GridProcessorError) {
        match err {
            GridProcessorError::MaskedData { .. } => self.dropped_masked += 1,
            _ => self.dropped_invalid += 1,
        }
    }
}

/// Resolve `fields` at a row, or the recoverable error that excludes it.
fn resolve_fields<'f>(
    attach: &RasterAttachment,
    fields: impl Iterator<Item = &'f RasterField>,
    lat: f64,
    lon: f64,
) -> Result<std::result::Result<BTreeMap<String, f64>, GridProcessorError>> {
    let mut values = BTreeMap::new();
    for field in fields {
        match attach.value(field, lat, lon) {
            Ok(v) => {
                values.insert(field.name.clone(), v);
            }
            Err(e) if e.is_recoverable() => return Ok(Err(e)),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(Ok(values))
}

/// Attach ERA5 single-level fields of `day` to rows, bucketed by rounded hour.
pub async fn attach_single_levels<R: RasterSource + ?Sized>(
    rows: Vec<AlignedFeatureRow>,
    day: NaiveDate,
    rasters: &R,
    attach: RasterAttachment,
) -> Result<AttachOutcome> {
    let buckets = bucket_by_hour_on(&rows, |r| r.obs_time, day);
    let mut slots: Vec<Option<AlignedFeatureRow>> = rows.into_iter().map(Some).collect();
    let mut outcome = AttachOutcome::default();

    outcome.deferred = buckets.skipped.iter().filter_map(|i| slots[*i].take()).collect();

    for (hour, indices) in buckets.iter() {
        let fields: Vec<RasterField> = rasters
            .fields(day, hour)
            .await?
            .into_iter()
            .filter(|f| f.level.is_none() && ERA5_SINGLE_LEVEL_FIELDS.contains(&f.name.as_str()))
            .collect();
        if fields.is_empty() {
            debug!(%day, hour, rows = indices.len(), "No single-level fields for hour");
            outcome.dropped_no_raster += indices.len();
            continue;
        }
        let raster_time = buckets.hour_datetime(hour);

        for idx in indices {
            let Some(mut row) = slots[*idx].take() else {
                continue;
            };
            match resolve_fields(&attach, fields.iter(), row.lat, row.lon)? {
                Ok(values) => {
                    row.raster_time = raster_time;
                    row.diff_mins = raster_time.map(|rt| minutes_from_hour(row.obs_time, rt));
                    row.single_levels = values;
                    row.derive_winds();
                    outcome.rows.push(row);
                }
                Err(e) => {
                    debug!(lat = row.lat, lon = row.lon, error = %e, "Dropping row");
                    outcome.drop_for(&e);
                }
            }
        }
    }

    debug!(
        %day,
        attached = outcome.rows.len(),
        deferred = outcome.deferred.len(),
        dropped = outcome.dropped(),
        "Attached single-level fields"
    );
    Ok(outcome)
}

/// Attach ERA5 pressure-level fields at each row's nearest level.
///
/// Rows must already carry their mean-sea-level pressure.
pub async fn attach_pressure_levels<R: RasterSource + ?Sized>(
    rows: Vec<AlignedFeatureRow>,
    day: NaiveDate,
    rasters: &R,
    attach: RasterAttachment,
    candidates: &[u32],
) -> Result<AttachOutcome> {
    let buckets = bucket_by_hour_on(&rows, |r| r.obs_time, day);
    let mut slots: Vec<Option<AlignedFeatureRow>> = rows.into_iter().map(Some).collect();
    let mut outcome = AttachOutcome::default();

    outcome.deferred = buckets.skipped.iter().filter_map(|i| slots[*i].take()).collect();

    for (hour, indices) in buckets.iter() {
        let fields: Vec<RasterField> = rasters
            .fields(day, hour)
            .await?
            .into_iter()
            .filter(|f| f.level.is_some() && ERA5_PRESSURE_LEVEL_FIELDS.contains(&f.name.as_str()))
            .collect();

        for idx in indices {
            let Some(mut row) = slots[*idx].take() else {
                continue;
            };
            let level = row
                .single_levels
                .get(MSL_FIELD)
                .and_then(|msl| select_pressure_level(*msl, candidates));
            let Some(level) = level else {
                outcome.dropped_no_raster += 1;
                continue;
            };

            let at_level = fields.iter().filter(|f| f.level == Some(level));
            if fields.iter().all(|f| f.level != Some(level)) {
                debug!(%day, hour, level, "No pressure-level fields at level");
                outcome.dropped_no_raster += 1;
                continue;
            }

            match resolve_fields(&attach, at_level, row.lat, row.lon)? {
                Ok(values) => {
                    row.pres_lvl = Some(level);
                    row.pressure_levels = values;
                    outcome.rows.push(row);
                }
                Err(e) => {
                    debug!(lat = row.lat, lon = row.lon, level, error = %e, "Dropping row");
                    outcome.drop_for(&e);
                }
            }
        }
    }

    debug!(
        %day,
        attached = outcome.rows.len(),
        dropped = outcome.dropped(),
        "Attached pressure-level fields"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tc_common::grids;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_offsets_in_cells() {
        assert_eq!(offset_in_cells((280.0, 25.0), (280.5, 24.74), 0.25, 20.0), (2, -1));
        // Target just east of the meridian, centre just west of it.
        assert_eq!(offset_in_cells((359.9, 0.0), (0.4, 0.0), 0.25, 20.0), (2, 0));
        assert_eq!(offset_in_cells((0.1, 0.0), (359.6, 0.0), 0.25, 20.0), (-2, 0));
    }

    #[test]
    fn test_select_pressure_level() {
        let candidates = [1000, 975, 950, 925];
        assert_eq!(select_pressure_level(101_325.0, &candidates), Some(1000));
        assert_eq!(select_pressure_level(96_000.0, &candidates), Some(950));
        // Equidistant between 975 and 950: the first candidate wins.
        assert_eq!(select_pressure_level(96_250.0, &candidates), Some(975));
        assert_eq!(select_pressure_level(96_000.0, &[]), None);
    }

    #[test]
    fn test_derive_winds() {
        let mut row = AlignedFeatureRow {
            source: SourceKind::Smap,
            sid: "S".to_string(),
            obs_time: test_utils::synoptic_time(),
            lon: 280.0,
            lat: 25.0,
            east_shift: 0,
            north_shift: 0,
            observations: [("smap_windspd".to_string(), 10.0)].into_iter().collect(),
            raster_time: None,
            diff_mins: None,
            single_levels: [(NEUTRAL_U_FIELD.to_string(), 3.0), (NEUTRAL_V_FIELD.to_string(), 4.0)]
                .into_iter()
                .collect(),
            pres_lvl: None,
            pressure_levels: BTreeMap::new(),
            era5_windspd: None,
            era5_winddir: None,
        };
        row.derive_winds();
        assert_approx_eq!(row.era5_windspd.unwrap(), 5.0, 1e-12);
        assert_approx_eq!(row.observations["smap_u_wind"], 6.0, 1e-9);
        assert_approx_eq!(row.observations["smap_v_wind"], 8.0, 1e-9);
    }

    #[test]
    fn test_cell_centres_follow_raster_resolution() {
        let quarter = RasterField::new(
            "sea_surface_temperature",
            linear_grid(grids::era5_0p25(), |lat, lon| lat + lon),
        );
        let half = RasterField::new(
            "sea_surface_temperature",
            linear_grid(grids::era5_0p50(), |lat, lon| lat + lon),
        );

        let rss = RasterAttachment::for_source(&SourceKind::Smap);
        assert_eq!(rss, RasterAttachment::CellCentres);
        assert_eq!(
            rss.placement(&quarter),
            (CellLookup::Centered { half_step: 0.125 }, CellMethod::AreaMean)
        );
        assert_eq!(rss.placement(&half), (CellLookup::Enclosing, CellMethod::Bilinear));

        let sfmr = RasterAttachment::for_source(&SourceKind::Sfmr);
        assert_eq!(sfmr.placement(&quarter), (CellLookup::Enclosing, CellMethod::Bilinear));

        // A satellite cell centre off the 0.5° lattice still resolves.
        let v = rss.value(&half, 20.125, 280.375).unwrap();
        assert_approx_eq!(v, 20.125 + 280.375, 1e-9);
        let v = rss.value(&quarter, 20.125, 280.375).unwrap();
        assert_approx_eq!(v, 20.125 + 280.375, 1e-9);
    }

    fn linear_grid(spec: tc_common::GridSpec, f: impl Fn(f64, f64) -> f64) -> grid_processor::MaskedGrid {
        let data = test_utils::field_grid(&spec.lats.values(), &spec.lons.values(), f);
        grid_processor::MaskedGrid::new(spec, data).unwrap()
    }

    #[test]
    fn test_wind_speed_brought_to_10m() {
        let fix = InterpolatedFix {
            sid: "S".to_string(),
            hour: 0,
            date_time: test_utils::synoptic_time(),
            lon: 280.0,
            lat: 25.0,
        };
        let mut quantities = sfmr::Quantities::default();
        quantities[Quantity::WindSpeed] = 20.0;
        quantities[Quantity::Sst] = 28.0;
        let avg = SquareAverage {
            center_index: 0,
            center_lon: 280.1,
            center_lat: 25.1,
            date_time: fix.date_time,
            lon: 280.1,
            lat: 25.1,
            quantities,
            point_count: 1,
        };

        let row = AlignedFeatureRow::from_sfmr(&fix, &avg, 0.25, 20.0);
        assert_approx_eq!(row.clone().at_10m(10.0).observations["windspd"], 20.0, 1e-12);

        let lifted = row.at_10m(4.0);
        assert!(lifted.observations["windspd"] > 20.0);
        assert_approx_eq!(lifted.observations["windspd"], tc_common::convert_to_10m(20.0, 4.0), 1e-12);
        assert_approx_eq!(lifted.observations["sst"], 28.0, 1e-12);
    }
}
