//! Generators for synthetic gridded and along-track data.
//!
//! The patterns are analytic so expected values can be computed directly in
//! the tests that use them.

use chrono::{DateTime, Duration, Utc};

/// Evenly spaced ascending axis values.
pub fn axis(first: f64, step: f64, len: usize) -> Vec<f64> {
    (0..len).map(|i| first + i as f64 * step).collect()
}

/// A row-major grid sampled from `f(lat, lon)`.
///
/// Bilinear interpolation reproduces any field of the form
/// `a + b*lat + c*lon + d*lat*lon` exactly, which makes such fields useful
/// for checking interpolated values.
pub fn field_grid<F>(lats: &[f64], lons: &[f64], f: F) -> Vec<f64>
where
    F: Fn(f64, f64) -> f64,
{
    let mut data = Vec::with_capacity(lats.len() * lons.len());
    for &lat in lats {
        for &lon in lons {
            data.push(f(lat, lon));
        }
    }
    data
}

/// The bilinear field used by most grid tests: `1 + 2*lat + 3*lon`.
pub fn linear_field(lat: f64, lon: f64) -> f64 {
    1.0 + 2.0 * lat + 3.0 * lon
}

/// A straight along-track flight path.
///
/// Returns `(time, lon, lat)` samples starting at `start` and moving by
/// `(dlon, dlat)` every `interval_secs` seconds.
pub fn straight_track(
    start: DateTime<Utc>,
    origin: (f64, f64),
    step: (f64, f64),
    interval_secs: i64,
    count: usize,
) -> Vec<(DateTime<Utc>, f64, f64)> {
    (0..count)
        .map(|i| {
            let k = i as f64;
            (
                start + Duration::seconds(interval_secs * i as i64),
                origin.0 + step.0 * k,
                origin.1 + step.1 * k,
            )
        })
        .collect()
}

/// Wind speeds that rise linearly from `base` by `step` per sample.
pub fn ramp(base: f64, step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| base + step * i as f64).collect()
}
