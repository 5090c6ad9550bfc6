//! Storm fixes and hourly interpolation between them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tc_common::{hours_between, normalize_lon, BoundingBox};

/// Radius of a wind threshold per quadrant, nautical miles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindRadii {
    pub ne: f64,
    pub se: f64,
    pub sw: f64,
    pub nw: f64,
}

/// One recorded storm position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StormFix {
    pub sid: String,
    pub date_time: DateTime<Utc>,
    pub lon: f64,
    pub lat: f64,
    /// 34-knot wind radii, when reported.
    pub r34: Option<WindRadii>,
}

impl StormFix {
    pub fn new(sid: impl Into<String>, date_time: DateTime<Utc>, lon: f64, lat: f64) -> Self {
        Self {
            sid: sid.into(),
            date_time,
            lon,
            lat,
            r34: None,
        }
    }

    /// Position with longitude in [0, 360).
    pub fn center(&self) -> (f64, f64) {
        (normalize_lon(self.lon), self.lat)
    }
}

/// A synthetic fix at a whole hour after a real one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolatedFix {
    pub sid: String,
    /// Hours after the interval's first fix.
    pub hour: u32,
    pub date_time: DateTime<Utc>,
    /// Longitude in [0, 360).
    pub lon: f64,
    pub lat: f64,
}

impl InterpolatedFix {
    /// Square box of the given half edge around this position.
    pub fn area(&self, half_edge: f64) -> BoundingBox {
        BoundingBox::around(self.lon, self.lat, half_edge)
    }
}

/// Longitude and latitude shift from `from` to `to`.
///
/// When the longitudes differ by more than `threshold` the segment is taken
/// to cross 0/360 and the smaller one is moved up by 360 first.
pub fn center_shift(from: &StormFix, to: &StormFix, threshold: f64) -> (f64, f64) {
    let (mut from_lon, from_lat) = from.center();
    let (mut to_lon, to_lat) = to.center();

    if (from_lon - to_lon).abs() > threshold {
        if from_lon < to_lon {
            from_lon += 360.0;
        } else {
            to_lon += 360.0;
        }
    }

    (to_lon - from_lon, to_lat - from_lat)
}

/// Hourly positions in `[a, b)`: one per whole hour between the two fixes.
pub fn interpolate_fixes(a: &StormFix, b: &StormFix, threshold: f64) -> Vec<InterpolatedFix> {
    let hours = hours_between(a.date_time, b.date_time);
    if hours == 0 {
        return Vec::new();
    }

    let (lon_shift, lat_shift) = center_shift(a, b, threshold);
    let (hourly_lon, hourly_lat) = (lon_shift / hours as f64, lat_shift / hours as f64);
    let (lon0, lat0) = a.center();

    (0..hours)
        .map(|h| InterpolatedFix {
            sid: a.sid.clone(),
            hour: h,
            date_time: a.date_time + Duration::hours(h as i64),
            lon: normalize_lon(lon0 + h as f64 * hourly_lon),
            lat: lat0 + h as f64 * hourly_lat,
        })
        .collect()
}
