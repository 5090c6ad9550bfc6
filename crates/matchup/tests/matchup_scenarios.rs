//! Storm matchup scenarios run against in-memory sources and stores.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use grid_processor::{MaskedGrid, RasterField};
use matchup::{
    attach_pressure_levels, attach_rasters, attach_single_levels, run_storm, AlignedFeatureRow, MatchState,
    MatchupConfig, MatchupEngine, RasterAttachment, StaticBriefIndex, StaticRasters,
    StaticTrackLoader, StormFix, UnmatchedReason,
};
use sfmr::{Quantities, Quantity, TrackPoint};
use storage::{
    feature_schema, match_schema, MemoryStore, RowStore, SourceKind, SFMR_QUANTITY_FIELDS,
};
use tc_common::{GridAxis, GridSpec};
use test_utils::{assert_approx_eq, assert_coords_approx_eq, utc};

const SID: &str = "2018242N13343";

fn point(at: DateTime<Utc>, lon: f64, lat: f64, windspd: f64) -> TrackPoint {
    let mut quantities = Quantities::default();
    quantities[Quantity::WindSpeed] = windspd;
    quantities[Quantity::Sst] = 28.0;
    TrackPoint {
        date_time: at,
        lon,
        lat,
        quantities,
    }
}

/// Five points one minute apart from `start`, stepping east by 0.02°.
fn short_leg(start: DateTime<Utc>, lon: f64, lat: f64) -> Vec<TrackPoint> {
    (0..5)
        .map(|i| point(start + Duration::minutes(i), lon + i as f64 * 0.02, lat, 30.0))
        .collect()
}

fn engine_with(points: Vec<TrackPoint>) -> MatchupEngine<StaticBriefIndex, StaticTrackLoader> {
    let mut tracks = StaticTrackLoader::new();
    let brief = tracks.insert("florence", "NOAA43_SFMR20180912I1.nc", points).unwrap();
    MatchupEngine::new(MatchupConfig::default(), StaticBriefIndex::new(vec![brief]), tracks)
}

/// Six-hour interval crossing the prime meridian eastwards at 10°N.
fn crossing_fixes() -> Vec<StormFix> {
    vec![
        StormFix::new(SID, utc(2018, 9, 12, 0, 0, 0), 359.0, 10.0),
        StormFix::new(SID, utc(2018, 9, 12, 6, 0, 0), 1.0, 10.0),
    ]
}

// ============================================================================
// Engine states
// ============================================================================

#[tokio::test]
async fn test_interval_across_prime_meridian() {
    // Points just west of 0° at 03:00, when the centre sits on 0°.
    let engine = engine_with(short_leg(utc(2018, 9, 12, 3, 0, 0), 359.70, 10.0));
    let fixes = crossing_fixes();
    let outcome = engine.match_interval(&fixes[0], &fixes[1]).await.unwrap();

    let expected = [359.0, 359.0 + 1.0 / 3.0, 359.0 + 2.0 / 3.0, 0.0, 1.0 / 3.0, 2.0 / 3.0];
    assert_eq!(outcome.hours.len(), 6);
    for (hour, lon) in outcome.hours.iter().zip(expected) {
        assert_coords_approx_eq!((hour.fix.lon, hour.fix.lat), (lon, 10.0), 1e-9);
    }

    assert_eq!(outcome.state, MatchState::Matched);
    assert!(outcome.state.is_terminal());
    assert_eq!(
        outcome.trace,
        vec![
            MatchState::NoCandidate,
            MatchState::TemporallyChecked,
            MatchState::SpatiallyChecked,
            MatchState::Matched
        ]
    );
    assert_eq!(outcome.matched_hours(), 1);
    assert!(outcome.hours[3].matched);
    assert_eq!(outcome.hours[3].observations[0].averages.len(), 1);

    let records = outcome.records();
    assert_eq!(records.len(), 6);
    assert_eq!(
        records.iter().filter(|r| r.matched).map(|r| r.date_time).collect::<Vec<_>>(),
        vec![utc(2018, 9, 12, 3, 0, 0)]
    );
}

#[tokio::test]
async fn test_no_temporal_overlap() {
    let engine = engine_with(short_leg(utc(2018, 9, 12, 10, 0, 0), 359.70, 10.0));
    let fixes = crossing_fixes();
    let outcome = engine.match_interval(&fixes[0], &fixes[1]).await.unwrap();

    assert_eq!(outcome.state, MatchState::Unmatched(UnmatchedReason::NoTemporalOverlap));
    assert_eq!(outcome.trace.len(), 2);
    assert_eq!(outcome.records().len(), 6);
    assert!(outcome.records().iter().all(|r| !r.matched));
}

#[tokio::test]
async fn test_no_spatial_overlap() {
    let engine = engine_with(short_leg(utc(2018, 9, 12, 3, 0, 0), 300.0, 10.0));
    let fixes = crossing_fixes();
    let outcome = engine.match_interval(&fixes[0], &fixes[1]).await.unwrap();

    assert_eq!(outcome.state, MatchState::Unmatched(UnmatchedReason::NoSpatialOverlap));
    assert_eq!(
        outcome.trace,
        vec![
            MatchState::NoCandidate,
            MatchState::TemporallyChecked,
            MatchState::Unmatched(UnmatchedReason::NoSpatialOverlap)
        ]
    );
    assert!(outcome.records().iter().all(|r| !r.matched));
}

#[tokio::test]
async fn test_slow_track_is_not_a_match() {
    let points = short_leg(utc(2018, 9, 12, 3, 0, 0), 359.70, 10.0)
        .into_iter()
        .map(|mut p| {
            p.quantities[Quantity::WindSpeed] = 8.0;
            p
        })
        .collect();
    let engine = engine_with(points);
    let fixes = crossing_fixes();
    let outcome = engine.match_interval(&fixes[0], &fixes[1]).await.unwrap();

    assert_eq!(outcome.state, MatchState::Unmatched(UnmatchedReason::NoValidObservations));
    assert_eq!(outcome.trace.len(), 4);
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_storm_run_persists_records_and_features() {
    let engine = engine_with(short_leg(utc(2018, 9, 12, 3, 0, 0), 359.70, 10.0));
    let store = MemoryStore::new();

    let report = run_storm(&engine, &store, &crossing_fixes(), None).await.unwrap();
    assert_eq!(report.sid, SID);
    assert_eq!(report.intervals, 1);
    assert_eq!(report.matched_hours, 1);
    assert_eq!(report.match_load.inserted, 6);
    assert_eq!(report.feature_rows, 1);
    assert_eq!(report.feature_load.inserted, 1);
    assert!(report.attach.is_none());

    let schema = match_schema("ibtracs", "sfmr", "na");
    assert_eq!(schema.name, "match_of_ibtracs_and_sfmr_na");
    let matches = store.fetch_all(&schema).await.unwrap();
    assert_eq!(matches.iter().filter(|r| r.value("match").as_bool() == Some(true)).count(), 1);

    let features = store.fetch_all(&feature_schema(&SourceKind::Sfmr, "na").unwrap()).await.unwrap();
    assert_eq!(features.len(), 1);
    let row = &features[0];
    assert_eq!(row.value("sid").as_str(), Some(SID));
    // Mean longitude 359.74 lies 0.26° west of the 0° centre.
    assert_eq!(row.value("east_shift_from_center").as_i64(), Some(-1));
    assert_eq!(row.value("north_shift_from_center").as_i64(), Some(0));
    assert_approx_eq!(row.value("windspd").as_f64().unwrap(), 30.0, 1e-12);
    assert!(row.value("era5_datetime").is_null());

    // A second run finds everything already stored.
    let again = run_storm(&engine, &store, &crossing_fixes(), None).await.unwrap();
    assert_eq!(again.match_load.inserted, 0);
    assert_eq!(again.match_load.skipped_existing, 6);
    assert_eq!(again.feature_load.skipped_existing, 1);
    assert_eq!(store.row_count("match_of_ibtracs_and_sfmr_na").await, 6);
}

// ============================================================================
// Raster attachment
// ============================================================================

fn regional_spec() -> GridSpec {
    GridSpec::new(
        "era5_regional",
        GridAxis::new(20.0, 0.25, 21),
        GridAxis::new(275.0, 0.25, 41),
    )
}

fn constant(name: &str, value: f64) -> RasterField {
    let spec = regional_spec();
    let n = spec.len();
    RasterField::new(name, MaskedGrid::new(spec, vec![value; n]).unwrap())
}

fn feature_row(at: DateTime<Utc>, lon: f64, lat: f64) -> AlignedFeatureRow {
    AlignedFeatureRow {
        source: SourceKind::Sfmr,
        sid: SID.to_string(),
        obs_time: at,
        lon,
        lat,
        east_shift: 0,
        north_shift: 0,
        observations: SFMR_QUANTITY_FIELDS
            .iter()
            .map(|name| (name.to_string(), if *name == "windspd" { 30.0 } else { 25.0 }))
            .collect(),
        raster_time: None,
        diff_mins: None,
        single_levels: Default::default(),
        pres_lvl: None,
        pressure_levels: Default::default(),
        era5_windspd: None,
        era5_winddir: None,
    }
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 9, 12).unwrap()
}

fn rasters() -> StaticRasters {
    let spec = regional_spec();
    let mut mask = vec![false; spec.len()];
    // Cell corner at 22.5°N 280.5°E.
    mask[10 * 41 + 22] = true;
    let msl = MaskedGrid::new(spec.clone(), vec![100_000.0; spec.len()])
        .unwrap()
        .with_mask(mask)
        .unwrap();

    let mut rasters = StaticRasters::new();
    rasters.insert(day(), 12, RasterField::new("mean_sea_level_pressure", msl));
    rasters.insert(day(), 12, constant("neutral_wind_at_10_m_u_component", 3.0));
    rasters.insert(day(), 12, constant("neutral_wind_at_10_m_v_component", 4.0));
    rasters.insert(day(), 12, constant("temperature", 290.0).at_level(1000));
    rasters.insert(day(), 12, constant("temperature", 280.0).at_level(950));
    rasters
}

#[tokio::test]
async fn test_masked_rows_are_dropped() {
    let rows = vec![
        feature_row(utc(2018, 9, 12, 12, 10, 0), 280.1, 22.1),
        feature_row(utc(2018, 9, 12, 12, 20, 0), 280.6, 22.6),
        feature_row(utc(2018, 9, 12, 13, 0, 0), 280.1, 22.1),
        feature_row(utc(2018, 9, 12, 23, 40, 0), 280.1, 22.1),
    ];
    let attach = RasterAttachment::for_source(&SourceKind::Sfmr);
    let rasters = rasters();

    let single = attach_single_levels(rows, day(), &rasters, attach).await.unwrap();
    assert_eq!(single.rows.len(), 1);
    assert_eq!(single.dropped_masked, 1);
    assert_eq!(single.dropped_no_raster, 1);
    assert_eq!(single.deferred.len(), 1);

    let row = &single.rows[0];
    assert_eq!(row.raster_time, Some(utc(2018, 9, 12, 12, 0, 0)));
    assert_eq!(row.diff_mins, Some(10));
    assert_approx_eq!(row.single_levels["mean_sea_level_pressure"], 100_000.0, 1e-6);
    assert_approx_eq!(row.era5_windspd.unwrap(), 5.0, 1e-12);

    let levels = matchup::default_pressure_levels();
    let pressure = attach_pressure_levels(single.rows, day(), &rasters, attach, &levels)
        .await
        .unwrap();
    assert_eq!(pressure.rows.len(), 1);
    let row = &pressure.rows[0];
    assert_eq!(row.pres_lvl, Some(1000));
    assert_approx_eq!(row.pressure_levels["temperature"], 290.0, 1e-9);

    let schema = feature_schema(&SourceKind::Sfmr, "na").unwrap();
    schema.validate_row(&row.to_row()).unwrap();
}

#[tokio::test]
async fn test_row_before_midnight_uses_next_day_raster() {
    let next_day = day();
    let mut rasters = StaticRasters::new();
    rasters.insert(next_day, 0, constant("mean_sea_level_pressure", 100_000.0));
    rasters.insert(next_day, 0, constant("neutral_wind_at_10_m_u_component", 3.0));
    rasters.insert(next_day, 0, constant("neutral_wind_at_10_m_v_component", 4.0));
    rasters.insert(next_day, 0, constant("temperature", 290.0).at_level(1000));

    let rows = vec![
        feature_row(utc(2018, 9, 11, 23, 40, 0), 280.1, 22.1),
        feature_row(utc(2018, 9, 12, 0, 10, 0), 280.2, 22.2),
    ];
    let (attached, summary) = attach_rasters(rows, &rasters, &matchup::default_pressure_levels())
        .await
        .unwrap();

    assert_eq!(summary.attached, 2);
    assert_eq!(summary.dropped_no_raster, 0);

    let late = attached
        .iter()
        .find(|r| r.obs_time == utc(2018, 9, 11, 23, 40, 0))
        .unwrap();
    assert_eq!(late.raster_time, Some(utc(2018, 9, 12, 0, 0, 0)));
    assert_eq!(late.diff_mins, Some(-20));
    assert_eq!(late.pres_lvl, Some(1000));

    let early = attached
        .iter()
        .find(|r| r.obs_time == utc(2018, 9, 12, 0, 10, 0))
        .unwrap();
    assert_eq!(early.diff_mins, Some(10));

    let schema = feature_schema(&SourceKind::Sfmr, "na").unwrap();
    for row in &attached {
        schema.validate_row(&row.to_row()).unwrap();
    }
}
