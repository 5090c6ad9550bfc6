//! Core types for raster value resolution.

use serde::{Deserialize, Serialize};
use tc_common::{CellIndex, GridSpec};

use crate::error::{GridProcessorError, Result};

/// A row-major raster on a regular grid, with an optional mask.
///
/// Rows follow the ascending latitude axis and columns the ascending
/// longitude axis of `spec`. A `true` mask entry marks a cell as having no
/// valid reading; the value stored underneath it is meaningless.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedGrid {
    pub spec: GridSpec,
    pub data: Vec<f64>,
    pub mask: Option<Vec<bool>>,
}

impl MaskedGrid {
    /// Create an unmasked grid.
    pub fn new(spec: GridSpec, data: Vec<f64>) -> Result<Self> {
        let expected = spec.len();
        if data.len() != expected {
            return Err(GridProcessorError::shape_mismatch(format!(
                "{}: {} values for {}x{} grid",
                spec.name,
                data.len(),
                spec.lats.len,
                spec.lons.len
            )));
        }
        Ok(Self {
            spec,
            data,
            mask: None,
        })
    }

    /// Attach an explicit mask.
    pub fn with_mask(mut self, mask: Vec<bool>) -> Result<Self> {
        if mask.len() != self.data.len() {
            return Err(GridProcessorError::shape_mismatch(format!(
                "{}: mask has {} entries for {} values",
                self.spec.name,
                mask.len(),
                self.data.len()
            )));
        }
        self.mask = Some(mask);
        Ok(self)
    }

    /// Build a grid whose mask marks every sentinel or NaN value.
    pub fn from_sentinel(spec: GridSpec, data: Vec<f64>, missing: f64) -> Result<Self> {
        let mask = data.iter().map(|v| v.is_nan() || *v == missing).collect();
        Self::new(spec, data)?.with_mask(mask)
    }

    pub fn height(&self) -> usize {
        self.spec.lats.len
    }

    pub fn width(&self) -> usize {
        self.spec.lons.len
    }

    pub fn has_mask(&self) -> bool {
        self.mask.is_some()
    }

    /// Number of masked cells.
    pub fn masked_count(&self) -> usize {
        self.mask
            .as_ref()
            .map(|m| m.iter().filter(|&&x| x).count())
            .unwrap_or(0)
    }

    pub fn is_masked(&self, row: usize, col: usize) -> bool {
        let idx = row * self.width() + col;
        self.mask
            .as_ref()
            .and_then(|m| m.get(idx).copied())
            .unwrap_or(false)
    }

    /// Value at a grid position, or `None` when masked or out of range.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.height() || col >= self.width() || self.is_masked(row, col) {
            return None;
        }
        self.data.get(row * self.width() + col).copied()
    }

    /// Grid coordinate of a position as `(lat, lon)`.
    pub fn coord(&self, row: usize, col: usize) -> (f64, f64) {
        (self.spec.lats.value(row), self.spec.lons.value(col))
    }

    /// The 2×2 neighbourhood addressed by a cell index.
    pub fn square(&self, cell: &CellIndex) -> CellSquare {
        let mut values = [[None; 2]; 2];
        for (i, row) in cell.lat_indices.iter().enumerate() {
            for (j, col) in cell.lon_indices.iter().enumerate() {
                values[i][j] = self.get(*row, *col);
            }
        }
        CellSquare {
            lats: cell.lats,
            lons: cell.lons,
            values,
        }
    }
}

/// Four corner values of one raster cell.
///
/// `values[i][j]` sits at `(lats[i], lons[j])`; `None` marks a masked corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSquare {
    pub lats: [f64; 2],
    pub lons: [f64; 2],
    pub values: [[Option<f64>; 2]; 2],
}

impl CellSquare {
    /// Build a square from loosely shaped input, rejecting anything but 2×2.
    pub fn from_slices(values: &[Vec<Option<f64>>], lats: &[f64], lons: &[f64]) -> Result<Self> {
        if lats.len() != 2 || lons.len() != 2 {
            return Err(GridProcessorError::invalid_square(format!(
                "expected 2 latitudes and 2 longitudes, got {} and {}",
                lats.len(),
                lons.len()
            )));
        }
        if values.len() != 2 || values.iter().any(|row| row.len() != 2) {
            return Err(GridProcessorError::invalid_square(format!(
                "expected 2x2 values, got {} rows",
                values.len()
            )));
        }

        Ok(Self {
            lats: [lats[0], lats[1]],
            lons: [lons[0], lons[1]],
            values: [[values[0][0], values[0][1]], [values[1][0], values[1][1]]],
        })
    }

    /// All four corner values, or `None` if any corner is masked.
    pub fn valid_values(&self) -> Option<[[f64; 2]; 2]> {
        let [[a, b], [c, d]] = self.values;
        Some([[a?, b?], [c?, d?]])
    }
}

/// How a cell value is derived from its four corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellMethod {
    /// Bilinear interpolation at the target point.
    #[default]
    Bilinear,
    /// Plain arithmetic mean of the four corners.
    AreaMean,
}

impl CellMethod {
    /// Method for a gridded observation centred in a cell of `resolution`.
    ///
    /// A native 0.25° cell is taken as representative of the observation
    /// cell it encloses; coarser grids are interpolated.
    pub fn select(resolution: f64) -> Self {
        if (resolution - 0.25).abs() < 1e-9 {
            Self::AreaMean
        } else {
            Self::Bilinear
        }
    }
}

impl std::fmt::Display for CellMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bilinear => write!(f, "bilinear"),
            Self::AreaMean => write!(f, "area_mean"),
        }
    }
}

/// How the cell around a target is located.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellLookup {
    /// Bracket the target with the nearest grid values on each axis.
    Enclosing,
    /// The target is a cell centre of an offset lattice; corners lie exactly
    /// `half_step` away on both axes.
    Centered { half_step: f64 },
}

/// One named variable of a raster source, optionally at a pressure level.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterField {
    pub name: String,
    /// Pressure level in hPa; `None` for single-level fields.
    pub level: Option<u32>,
    pub grid: MaskedGrid,
}

impl RasterField {
    pub fn new(name: impl Into<String>, grid: MaskedGrid) -> Self {
        Self {
            name: name.into(),
            level: None,
            grid,
        }
    }

    pub fn at_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

}
