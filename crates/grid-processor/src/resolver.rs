//! Point lookups on masked grids.

use tracing::trace;

use crate::error::Result;
use crate::interpolation::resolve_square;
use crate::types::{CellLookup, CellMethod, MaskedGrid};

/// Value of a grid at a target point.
///
/// Locates the cell around the target, then derives the value with
/// `method`. Off-grid targets yield `InvalidWindow`; cells touching a masked
/// corner yield `MaskedData`.
pub fn resolve(
    grid: &MaskedGrid,
    lat: f64,
    lon: f64,
    lookup: CellLookup,
    method: CellMethod,
) -> Result<f64> {
    let cell = match lookup {
        CellLookup::Enclosing => grid.spec.enclosing_cell(lat, lon)?,
        CellLookup::Centered { half_step } => grid.spec.centered_cell(lat, lon, half_step)?,
    };
    let square = grid.square(&cell);

    // Targets east of the last column sit in a cell whose upper longitude
    // continues past 360.
    let lon = tc_common::normalize_lon(lon);
    let lon = if lon < square.lons[0] { lon + 360.0 } else { lon };

    trace!(
        grid = %grid.spec.name,
        lat, lon,
        lat_indices = ?cell.lat_indices,
        lon_indices = ?cell.lon_indices,
        %method,
        "resolving cell"
    );

    resolve_square(&square, lat, lon, method)
}
