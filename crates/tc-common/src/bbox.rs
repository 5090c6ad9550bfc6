//! Axis-aligned geographic boxes and the rectangle overlap test.

use serde::{Deserialize, Serialize};

/// A geographic bounding box in degrees.
///
/// Longitudes are not required to lie in [0, 360): boxes built around a
/// point near the prime meridian may extend below 0 or past 360. Use the
/// `*_wrapped` variants when comparing against normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Build a box from a top-left and bottom-right corner, each `(lon, lat)`.
    pub fn from_corners(top_left: (f64, f64), bottom_right: (f64, f64)) -> Self {
        Self::new(top_left.0, bottom_right.1, bottom_right.0, top_left.1)
    }

    /// Square box of the given half edge centred on a point.
    pub fn around(lon: f64, lat: f64, half_edge: f64) -> Self {
        Self::new(lon - half_edge, lat - half_edge, lon + half_edge, lat + half_edge)
    }

    /// Top-left corner as `(lon, lat)`.
    pub fn top_left(&self) -> (f64, f64) {
        (self.min_lon, self.max_lat)
    }

    /// Bottom-right corner as `(lon, lat)`.
    pub fn bottom_right(&self) -> (f64, f64) {
        (self.max_lon, self.min_lat)
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Separating-axis test: the boxes overlap unless one lies entirely to
    /// the side of, or entirely above/below, the other. Touching edges count
    /// as overlapping.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        let (l1, r1) = (self.top_left(), self.bottom_right());
        let (l2, r2) = (other.top_left(), other.bottom_right());

        if l1.0 > r2.0 || l2.0 > r1.0 {
            return false;
        }
        if l1.1 < r2.1 || l2.1 < r1.1 {
            return false;
        }
        true
    }

    /// Overlap test that also tries the other box shifted by ±360° in longitude.
    pub fn overlaps_wrapped(&self, other: &BoundingBox) -> bool {
        [0.0, 360.0, -360.0]
            .iter()
            .any(|shift| self.overlaps(&other.shift_lon(*shift)))
    }

    /// Compute the intersection of two bounding boxes.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        if !self.overlaps(other) {
            return None;
        }

        Some(BoundingBox {
            min_lon: self.min_lon.max(other.min_lon),
            min_lat: self.min_lat.max(other.min_lat),
            max_lon: self.max_lon.min(other.max_lon),
            max_lat: self.max_lat.min(other.max_lat),
        })
    }

    /// Check if a point is contained within this bbox (edges inclusive).
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// Containment that tolerates the box extending past 0 or 360.
    pub fn contains_point_wrapped(&self, lon: f64, lat: f64) -> bool {
        [0.0, 360.0, -360.0]
            .iter()
            .any(|shift| self.contains_point(lon + shift, lat))
    }

    /// The same box moved east by `degrees`.
    pub fn shift_lon(&self, degrees: f64) -> BoundingBox {
        BoundingBox {
            min_lon: self.min_lon + degrees,
            max_lon: self.max_lon + degrees,
            ..*self
        }
    }
}
