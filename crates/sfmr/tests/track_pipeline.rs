//! Decoding raw SFMR arrays and reducing them to square averages.

use chrono::{DateTime, Datelike, Timelike, Utc};
use sfmr::{Quantity, SfmrArrays, SfmrError, TrackBrief, TrackSegmenter};
use test_utils::{assert_approx_eq, ramp, straight_track, utc};

/// Raw arrays for a straight eastward leg, with LON in [-180, 180).
fn eastward_leg(count: usize) -> SfmrArrays {
    let track = straight_track(
        utc(2018, 9, 12, 12, 0, 0),
        (-80.0, 25.0),
        (0.015625, 0.0),
        10,
        count,
    );
    let token = |t: &DateTime<Utc>| {
        (
            (t.year() as i64) * 10000 + (t.month() as i64) * 100 + t.day() as i64,
            (t.hour() as i64) * 10000 + (t.minute() as i64) * 100 + t.second() as i64,
        )
    };

    let mut arrays = SfmrArrays::default();
    for (t, lon, lat) in &track {
        let (date, time) = token(t);
        arrays.date.push(date);
        arrays.time.push(time);
        arrays.lon.push(*lon);
        arrays.lat.push(*lat);
    }
    for q in Quantity::ALL {
        arrays.quantities[q as usize] = vec![1.0; count];
    }
    arrays.quantities[Quantity::WindSpeed as usize] = ramp(20.0, 1.0, count);
    arrays
}

// ============================================================================
// Decode then segment
// ============================================================================

#[test]
fn test_leg_reduces_to_three_squares() {
    let points = eastward_leg(33).decode("leg.nc").unwrap();
    assert_eq!(points.len(), 33);
    assert_eq!(points[0].lon, 280.0);

    let averages = TrackSegmenter::default().average(&points);
    let counts: Vec<usize> = averages.iter().map(|a| a.point_count).collect();
    assert_eq!(counts, vec![9, 16, 8]);

    let first = &averages[0];
    assert_eq!(first.center_lon, 280.0);
    assert_approx_eq!(first.lon, 280.0625, 1e-9);
    assert_approx_eq!(first.windspd(), 24.0, 1e-9);
    assert_eq!(first.date_time, utc(2018, 9, 12, 12, 0, 40));

    let last = &averages[2];
    assert_eq!(last.center_lon, 280.5);
    // Samples 25..=32 carry wind speeds 45..=52.
    assert_approx_eq!(last.windspd(), 48.5, 1e-9);
}

#[test]
fn test_flagged_records_never_reach_a_square() {
    let mut arrays = eastward_leg(8);
    let mut flag = vec![0; 8];
    flag[4] = 1;
    arrays.flag = Some(flag);

    let points = arrays.decode("leg.nc").unwrap();
    assert_eq!(points.len(), 7);

    let averages = TrackSegmenter::default().average(&points);
    assert_eq!(averages.len(), 1);
    assert_eq!(averages[0].point_count, 7);
}

#[test]
fn test_brief_covers_decoded_track() {
    let points = eastward_leg(33).decode("leg.nc").unwrap();
    let brief = TrackBrief::from_points("florence", "leg.nc", &points).unwrap();
    assert_eq!(brief.start, utc(2018, 9, 12, 12, 0, 0));
    assert_eq!(brief.end, utc(2018, 9, 12, 12, 5, 20));
    assert_eq!(brief.min_lon, 280.0);
    assert_eq!(brief.max_lon, 280.5);
    assert_eq!(brief.min_lat, 25.0);
}

// ============================================================================
// Failure modes
// ============================================================================

#[test]
fn test_ragged_arrays_are_rejected() {
    let mut arrays = eastward_leg(5);
    arrays.lat.pop();
    let err = arrays.decode("ragged.nc").unwrap_err();
    assert!(matches!(err, SfmrError::Shape { ref variable, .. } if variable == "LAT"));
    assert_eq!(err.file(), "ragged.nc");
}

#[test]
fn test_bad_time_token_names_the_record() {
    let mut arrays = eastward_leg(5);
    arrays.time[3] = 126199;
    match arrays.decode("bad.nc").unwrap_err() {
        SfmrError::Parse { index, .. } => assert_eq!(index, 3),
        other => panic!("unexpected error: {other}"),
    }
}
