//! Regular lat/lon grids, nearest-point indexing and spatial windows.

use serde::{Deserialize, Serialize};

use crate::error::{TcError, TcResult};

/// Tolerance used when comparing computed grid coordinates.
const COORD_EPSILON: f64 = 1e-9;

/// Normalize a longitude into [0, 360).
pub fn normalize_lon(lon: f64) -> f64 {
    ((lon % 360.0) + 360.0) % 360.0
}

/// Find the axis value closest to `value`.
///
/// Returns the matched value and its index. Ties resolve to the lowest
/// index. Returns `None` for an empty axis.
pub fn nearest_index(value: f64, axis: &[f64]) -> Option<(f64, usize)> {
    let mut best: Option<(f64, usize)> = None;
    let mut best_diff = f64::INFINITY;

    for (i, &v) in axis.iter().enumerate() {
        let diff = (value - v).abs();
        if diff < best_diff {
            best_diff = diff;
            best = Some((v, i));
        }
    }

    best
}

/// Which end of a range a corner lookup is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    Lower,
    Upper,
}

/// Corner lookup for a region bound.
///
/// A lower bound whose nearest grid point lies above it moves one step
/// down; an upper bound whose nearest point lies below it moves one step
/// up. The region is therefore never truncated. The returned index can be
/// `-1` or `axis.len()` when the bound falls just outside the axis.
pub fn range_bound_index(
    value: f64,
    bound: RangeBound,
    axis: &[f64],
    step: f64,
) -> Option<(f64, isize)> {
    let (matched, idx) = nearest_index(value, axis)?;
    let idx = idx as isize;

    Some(match bound {
        RangeBound::Lower if matched > value => (matched - step, idx - 1),
        RangeBound::Upper if matched < value => (matched + step, idx + 1),
        _ => (matched, idx),
    })
}

/// One ascending, evenly spaced axis of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridAxis {
    pub first: f64,
    pub step: f64,
    pub len: usize,
    /// The axis covers a full 360° circle (global longitudes).
    pub periodic: bool,
}

impl GridAxis {
    pub fn new(first: f64, step: f64, len: usize) -> Self {
        Self {
            first,
            step,
            len,
            periodic: false,
        }
    }

    /// A longitude axis spanning the whole globe.
    pub fn periodic(first: f64, step: f64) -> Self {
        Self {
            first,
            step,
            len: (360.0 / step).round() as usize,
            periodic: true,
        }
    }

    pub fn value(&self, index: usize) -> f64 {
        self.first + index as f64 * self.step
    }

    pub fn last(&self) -> f64 {
        self.value(self.len.saturating_sub(1))
    }

    pub fn values(&self) -> Vec<f64> {
        (0..self.len).map(|i| self.value(i)).collect()
    }

    /// Nearest axis point, ties to the lowest index.
    pub fn nearest(&self, value: f64) -> Option<(f64, usize)> {
        if self.len == 0 {
            return None;
        }

        let pos = (value - self.first) / self.step;
        let lo = (pos.floor().max(0.0) as usize).min(self.len - 1);
        let hi = (lo + 1).min(self.len - 1);

        let (lo_v, hi_v) = (self.value(lo), self.value(hi));
        if (value - hi_v).abs() < (value - lo_v).abs() {
            Some((hi_v, hi))
        } else {
            Some((lo_v, lo))
        }
    }

    /// Index of an exact axis value, if present.
    pub fn index_of(&self, value: f64) -> Option<usize> {
        let (v, i) = self.nearest(value)?;
        ((v - value).abs() < 1e-6).then_some(i)
    }

    /// Resolve a possibly out-of-range index.
    ///
    /// Periodic axes wrap around and report the continued coordinate
    /// (e.g. 360.0 rather than 0.0) so that corner pairs stay ascending.
    pub fn resolve(&self, index: isize) -> Option<(f64, usize)> {
        let n = self.len as isize;
        if (0..n).contains(&index) {
            return Some((self.value(index as usize), index as usize));
        }
        if !self.periodic || n == 0 {
            return None;
        }
        let wrapped = index.rem_euclid(n) as usize;
        Some((self.first + index as f64 * self.step, wrapped))
    }
}

/// A point of a named grid with its indices.
///
/// Latitude lies in [-90, 90] and longitude in [0, 360).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub lat: f64,
    pub lon: f64,
    pub lat_index: usize,
    pub lon_index: usize,
}

/// The two bracketing indices on each axis around a target point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellIndex {
    pub lats: [f64; 2],
    pub lons: [f64; 2],
    pub lat_indices: [usize; 2],
    pub lon_indices: [usize; 2],
}

/// A square sub-region of a grid around a center point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubsetWindow {
    pub lat1: f64,
    pub lat2: f64,
    pub lon1: f64,
    pub lon2: f64,
    pub lat_indices: (usize, usize),
    pub lon_indices: (usize, usize),
    /// `lon1 > lon2`: the window spans the 0/360 seam.
    pub crosses_prime_meridian: bool,
}

impl SubsetWindow {
    /// Corners as `(lat, lon)`: lower-left, lower-right, upper-left, upper-right.
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.lat1, self.lon1),
            (self.lat1, self.lon2),
            (self.lat2, self.lon1),
            (self.lat2, self.lon2),
        ]
    }

    /// Extend the upper bounds by one grid step, as reanalysis area requests expect.
    pub fn padded(mut self, step: f64) -> Self {
        self.lat2 += step;
        self.lon2 += step;
        self.lat_indices.1 += 1;
        self.lon_indices.1 += 1;
        self
    }
}

/// Named regular grids used by the supported sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridKind {
    /// RSS radiometer/scatterometer daily composites, 0.25° cell centres.
    Rss,
    /// SMAP 0.25°, same lattice as RSS.
    Smap,
    /// CCMP 0.25°, latitude-limited.
    Ccmp,
    /// ERA5 at native 0.25°.
    Era5Quarter,
    /// ERA5 at 0.5°.
    Era5Half,
}

impl GridKind {
    pub fn spec(&self) -> GridSpec {
        match self {
            GridKind::Rss => grids::rss_0p25(),
            GridKind::Smap => grids::smap_0p25(),
            GridKind::Ccmp => grids::ccmp_0p25(),
            GridKind::Era5Quarter => grids::era5_0p25(),
            GridKind::Era5Half => grids::era5_0p50(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GridKind::Rss => "rss_0p25",
            GridKind::Smap => "smap_0p25",
            GridKind::Ccmp => "ccmp_0p25",
            GridKind::Era5Quarter => "era5_0p25",
            GridKind::Era5Half => "era5_0p50",
        }
    }
}

/// Specification of a regular lat/lon grid with ascending axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub name: String,
    pub lats: GridAxis,
    pub lons: GridAxis,
}

impl GridSpec {
    pub fn new(name: impl Into<String>, lats: GridAxis, lons: GridAxis) -> Self {
        Self {
            name: name.into(),
            lats,
            lons,
        }
    }

    /// Latitude spacing in degrees.
    pub fn resolution(&self) -> f64 {
        self.lats.step
    }

    /// Total number of grid points.
    pub fn len(&self) -> usize {
        self.lats.len * self.lons.len
    }

    pub fn is_empty(&self) -> bool {
        self.lats.len == 0 || self.lons.len == 0
    }

    /// Nearest grid point to a coordinate; longitude is normalized first.
    pub fn nearest_point(&self, lat: f64, lon: f64) -> TcResult<GridPoint> {
        if !(-90.0..=90.0).contains(&lat) || !lat.is_finite() {
            return Err(TcError::InvalidCoordinate(format!("latitude {}", lat)));
        }
        if !lon.is_finite() {
            return Err(TcError::InvalidCoordinate(format!("longitude {}", lon)));
        }

        let (lat_v, lat_i) = self
            .lats
            .nearest(lat)
            .ok_or_else(|| TcError::EmptyAxis(format!("{} latitudes", self.name)))?;
        let (lon_v, lon_i) = self
            .lons
            .nearest(normalize_lon(lon))
            .ok_or_else(|| TcError::EmptyAxis(format!("{} longitudes", self.name)))?;

        Ok(GridPoint {
            lat: lat_v,
            lon: lon_v,
            lat_index: lat_i,
            lon_index: lon_i,
        })
    }

    /// Square window of `edge` degrees around the grid point nearest the center.
    ///
    /// Fails with `InvalidWindow` if the window would cross a pole, or if the
    /// normalized longitude bounds no longer span `edge` because the window
    /// straddles the prime meridian.
    pub fn subset_range(&self, center_lat: f64, center_lon: f64, edge: f64) -> TcResult<SubsetWindow> {
        let window = self.subset_range_wrapping(center_lat, center_lon, edge)?;
        if window.crosses_prime_meridian {
            return Err(TcError::invalid_window(
                center_lat,
                center_lon,
                "window straddles the prime meridian",
            ));
        }
        Ok(window)
    }

    /// Like [`GridSpec::subset_range`], but a window straddling the prime
    /// meridian is returned with `crosses_prime_meridian` set.
    pub fn subset_range_wrapping(
        &self,
        center_lat: f64,
        center_lon: f64,
        edge: f64,
    ) -> TcResult<SubsetWindow> {
        let center = self.nearest_point(center_lat, center_lon)?;
        let half = edge / 2.0;

        if center.lat.abs() + half > 90.0 {
            return Err(TcError::invalid_window(
                center_lat,
                center_lon,
                "window crosses a pole",
            ));
        }

        let lat1 = center.lat - half;
        let lat2 = center.lat + half;
        let lon1 = normalize_lon(center.lon - half);
        let lon2 = normalize_lon(center.lon + half);
        let crosses = ((lon2 - lon1) - 2.0 * half).abs() > COORD_EPSILON;

        Ok(SubsetWindow {
            lat1,
            lat2,
            lon1,
            lon2,
            lat_indices: (
                corner_index(&self.lats, lat1, RangeBound::Lower),
                corner_index(&self.lats, lat2, RangeBound::Upper),
            ),
            lon_indices: (
                corner_index(&self.lons, lon1, RangeBound::Lower),
                corner_index(&self.lons, lon2, RangeBound::Upper),
            ),
            crosses_prime_meridian: crosses,
        })
    }

    /// The grid cell bracketing a target point.
    ///
    /// On each axis the nearest grid value becomes the lower corner if it is
    /// below the target and the upper corner otherwise; the other corner is
    /// the adjacent index. Global longitude axes wrap across the seam.
    pub fn enclosing_cell(&self, lat: f64, lon: f64) -> TcResult<CellIndex> {
        let lon = normalize_lon(lon);
        let (lats, lat_indices) = bracket(&self.lats, lat)
            .ok_or_else(|| TcError::invalid_window(lat, lon, "latitude outside grid"))?;
        let (lons, lon_indices) = bracket(&self.lons, lon)
            .ok_or_else(|| TcError::invalid_window(lat, lon, "longitude outside grid"))?;

        Ok(CellIndex {
            lats,
            lons,
            lat_indices,
            lon_indices,
        })
    }

    /// The cell whose corners sit exactly `half_step` away from a point of
    /// another, offset lattice (e.g. an RSS cell centre on the ERA5 grid).
    pub fn centered_cell(&self, lat: f64, lon: f64, half_step: f64) -> TcResult<CellIndex> {
        let lon = normalize_lon(lon);
        let mut lat_indices = [0usize; 2];
        let mut lon_indices = [0usize; 2];
        let lats = [lat - half_step, lat + half_step];
        let lons = [lon - half_step, lon + half_step];

        for k in 0..2 {
            lat_indices[k] = self
                .lats
                .index_of(lats[k])
                .ok_or_else(|| TcError::invalid_window(lat, lon, "corner latitude not on grid"))?;
            lon_indices[k] = exact_lon_index(&self.lons, lons[k])
                .ok_or_else(|| TcError::invalid_window(lat, lon, "corner longitude not on grid"))?;
        }

        Ok(CellIndex {
            lats,
            lons,
            lat_indices,
            lon_indices,
        })
    }
}

/// Axis index of a window corner; periodic axes wrap, others clamp.
fn corner_index(axis: &GridAxis, value: f64, bound: RangeBound) -> usize {
    let values = axis.values();
    let n = values.len() as isize;
    match range_bound_index(value, bound, &values, axis.step) {
        Some((_, i)) if axis.periodic => i.rem_euclid(n) as usize,
        Some((_, i)) => i.clamp(0, n - 1) as usize,
        None => 0,
    }
}

fn bracket(axis: &GridAxis, value: f64) -> Option<([f64; 2], [usize; 2])> {
    let (nearest, idx) = axis.nearest(value)?;
    let idx = idx as isize;
    let (lo, hi) = if nearest < value {
        (idx, idx + 1)
    } else {
        (idx - 1, idx)
    };
    let (lo_v, lo_i) = axis.resolve(lo)?;
    let (hi_v, hi_i) = axis.resolve(hi)?;
    Some(([lo_v, hi_v], [lo_i, hi_i]))
}

fn exact_lon_index(axis: &GridAxis, lon: f64) -> Option<usize> {
    if axis.periodic {
        axis.index_of(normalize_lon(lon))
    } else {
        axis.index_of(lon)
    }
}

/// Grid definitions for the supported sources.
pub mod grids {
    use super::*;

    /// RSS 0.25° daily composite grid (cell centres).
    pub fn rss_0p25() -> GridSpec {
        GridSpec::new(
            "rss_0p25",
            GridAxis::new(-89.875, 0.25, 720),
            GridAxis::periodic(0.125, 0.25),
        )
    }

    /// SMAP 0.25° grid, identical lattice to RSS.
    pub fn smap_0p25() -> GridSpec {
        GridSpec {
            name: "smap_0p25".to_string(),
            ..rss_0p25()
        }
    }

    /// CCMP 0.25° grid, covering 78.375°S to 78.375°N.
    pub fn ccmp_0p25() -> GridSpec {
        GridSpec::new(
            "ccmp_0p25",
            GridAxis::new(-78.375, 0.25, 628),
            GridAxis::periodic(0.125, 0.25),
        )
    }

    /// ERA5 0.25° global grid (ascending latitudes).
    pub fn era5_0p25() -> GridSpec {
        GridSpec::new(
            "era5_0p25",
            GridAxis::new(-90.0, 0.25, 721),
            GridAxis::periodic(0.0, 0.25),
        )
    }

    /// ERA5 0.5° global grid.
    pub fn era5_0p50() -> GridSpec {
        GridSpec::new(
            "era5_0p50",
            GridAxis::new(-90.0, 0.5, 361),
            GridAxis::periodic(0.0, 0.5),
        )
    }
}
