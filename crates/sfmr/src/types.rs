//! Along-track observation types.

use std::ops::{Index, IndexMut};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tc_common::{BoundingBox, TimeRange};

/// Physical quantities measured along an SFMR track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    AirTemp,
    Salinity,
    Sst,
    RainRate,
    WindSpeed,
}

impl Quantity {
    pub const ALL: [Quantity; 5] = [
        Quantity::AirTemp,
        Quantity::Salinity,
        Quantity::Sst,
        Quantity::RainRate,
        Quantity::WindSpeed,
    ];

    /// Column name used in feature tables.
    pub fn name(&self) -> &'static str {
        match self {
            Quantity::AirTemp => "air_temp",
            Quantity::Salinity => "salinity",
            Quantity::Sst => "sst",
            Quantity::RainRate => "rain_rate",
            Quantity::WindSpeed => "windspd",
        }
    }

    /// Variable name inside SFMR NetCDF files.
    pub fn nc_variable(&self) -> &'static str {
        match self {
            Quantity::AirTemp => "ATEMP",
            Quantity::Salinity => "SALN",
            Quantity::Sst => "SST",
            Quantity::RainRate => "SRR",
            Quantity::WindSpeed => "SWS",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// One value per [`Quantity`]; values `<= 0` are treated as missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Quantities([f64; 5]);

impl Quantities {
    pub fn new(values: [f64; 5]) -> Self {
        Self(values)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Quantity, f64)> + '_ {
        Quantity::ALL.iter().map(move |q| (*q, self.0[q.slot()]))
    }
}

impl Index<Quantity> for Quantities {
    type Output = f64;

    fn index(&self, q: Quantity) -> &f64 {
        &self.0[q.slot()]
    }
}

impl IndexMut<Quantity> for Quantities {
    fn index_mut(&mut self, q: Quantity) -> &mut f64 {
        &mut self.0[q.slot()]
    }
}

/// A single parsed along-track observation. Longitude is in [0, 360).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub date_time: DateTime<Utc>,
    pub lon: f64,
    pub lat: f64,
    pub quantities: Quantities,
}

impl TrackPoint {
    pub fn windspd(&self) -> f64 {
        self.quantities[Quantity::WindSpeed]
    }
}

/// Temporal and spatial extent of one SFMR file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackBrief {
    pub hurricane: String,
    pub filename: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl TrackBrief {
    /// Extent of a decoded track; `None` for an empty one.
    pub fn from_points(
        hurricane: impl Into<String>,
        filename: impl Into<String>,
        points: &[TrackPoint],
    ) -> Option<Self> {
        let first = points.first()?;
        let mut brief = TrackBrief {
            hurricane: hurricane.into(),
            filename: filename.into(),
            start: first.date_time,
            end: first.date_time,
            min_lat: first.lat,
            max_lat: first.lat,
            min_lon: first.lon,
            max_lon: first.lon,
        };

        for p in &points[1..] {
            brief.start = brief.start.min(p.date_time);
            brief.end = brief.end.max(p.date_time);
            brief.min_lat = brief.min_lat.min(p.lat);
            brief.max_lat = brief.max_lat.max(p.lat);
            brief.min_lon = brief.min_lon.min(p.lon);
            brief.max_lon = brief.max_lon.max(p.lon);
        }

        Some(brief)
    }

    /// Identifier unique across hurricanes.
    pub fn key(&self) -> String {
        format!("{}/{}", self.hurricane, self.filename)
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }

    pub fn extent(&self) -> BoundingBox {
        BoundingBox::new(self.min_lon, self.min_lat, self.max_lon, self.max_lat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::utc;

    fn point(minute: u32, lon: f64, lat: f64) -> TrackPoint {
        TrackPoint {
            date_time: utc(2018, 9, 12, 12, minute, 0),
            lon,
            lat,
            quantities: Quantities::default(),
        }
    }

    #[test]
    fn test_quantity_indexing() {
        let mut q = Quantities::default();
        q[Quantity::WindSpeed] = 42.0;
        assert_eq!(q[Quantity::WindSpeed], 42.0);
        assert_eq!(q.iter().filter(|(_, v)| *v != 0.0).count(), 1);
    }

    #[test]
    fn test_brief_extent() {
        let pts = [point(0, 280.0, 25.0), point(5, 281.0, 24.0), point(2, 279.5, 26.0)];
        let brief = TrackBrief::from_points("florence", "file.nc", &pts).unwrap();
        assert_eq!(brief.start, utc(2018, 9, 12, 12, 0, 0));
        assert_eq!(brief.end, utc(2018, 9, 12, 12, 5, 0));
        assert_eq!(brief.extent(), BoundingBox::new(279.5, 24.0, 281.0, 26.0));
        assert_eq!(brief.key(), "florence/file.nc");
        assert!(TrackBrief::from_points("x", "y", &[]).is_none());
    }
}
