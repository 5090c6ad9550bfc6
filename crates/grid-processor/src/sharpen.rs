//! Doubling the density of a coarse reanalysis grid.
//!
//! Original points land on even indices of the new grid. Each original cell
//! whose four corners are all valid fills its centre and the midpoints of
//! its four edges by bilinear interpolation; every other odd position stays
//! masked.

use tc_common::{GridAxis, GridSpec};
use tracing::debug;

use crate::error::{GridProcessorError, Result};
use crate::interpolation::bilinear_interpolate;
use crate::types::{CellSquare, MaskedGrid};

fn densify(axis: &GridAxis) -> GridAxis {
    GridAxis::new(axis.first, axis.step / 2.0, 2 * axis.len - 1)
}

/// Sharpen a grid to twice its resolution.
///
/// The output carries a mask whenever the input does, or whenever some
/// position could not be filled. Values under the mask are NaN.
pub fn sharpen(grid: &MaskedGrid) -> Result<MaskedGrid> {
    let (ny, nx) = (grid.height(), grid.width());
    if ny == 0 || nx == 0 {
        return Err(GridProcessorError::shape_mismatch(format!(
            "cannot sharpen empty grid {}",
            grid.spec.name
        )));
    }

    let spec = GridSpec::new(
        format!("{}_sharpened", grid.spec.name),
        densify(&grid.spec.lats),
        densify(&grid.spec.lons),
    );
    let width = spec.lons.len;
    let mut cells: Vec<Option<f64>> = vec![None; spec.len()];

    for y in 0..ny {
        for x in 0..nx {
            cells[(2 * y) * width + 2 * x] = grid.get(y, x);
        }
    }

    let mut filled_squares = 0usize;
    for y in 0..ny.saturating_sub(1) {
        for x in 0..nx.saturating_sub(1) {
            let square = CellSquare {
                lats: [grid.spec.lats.value(y), grid.spec.lats.value(y + 1)],
                lons: [grid.spec.lons.value(x), grid.spec.lons.value(x + 1)],
                values: [
                    [grid.get(y, x), grid.get(y, x + 1)],
                    [grid.get(y + 1, x), grid.get(y + 1, x + 1)],
                ],
            };
            if square.valid_values().is_none() {
                continue;
            }

            let targets = [
                (2 * y + 1, 2 * x + 1), // centre
                (2 * y, 2 * x + 1),     // top
                (2 * y + 2, 2 * x + 1), // bottom
                (2 * y + 1, 2 * x),     // left
                (2 * y + 1, 2 * x + 2), // right
            ];
            for (row, col) in targets {
                let value = bilinear_interpolate(&square, spec.lats.value(row), spec.lons.value(col))?;
                cells[row * width + col] = Some(value);
            }
            filled_squares += 1;
        }
    }

    let unfilled = cells.iter().filter(|c| c.is_none()).count();
    debug!(
        grid = %grid.spec.name,
        from = ?(ny, nx),
        to = ?(spec.lats.len, width),
        filled_squares,
        unfilled,
        "sharpened grid"
    );

    let data: Vec<f64> = cells.iter().map(|c| c.unwrap_or(f64::NAN)).collect();
    let sharpened = MaskedGrid::new(spec, data)?;
    if grid.has_mask() || unfilled > 0 {
        sharpened.with_mask(cells.iter().map(Option::is_none).collect())
    } else {
        Ok(sharpened)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, field_grid, linear_field};

    fn grid(n_lat: usize, n_lon: usize) -> MaskedGrid {
        let spec = GridSpec::new(
            "era5_0p50",
            GridAxis::new(20.0, 0.5, n_lat),
            GridAxis::new(280.0, 0.5, n_lon),
        );
        let data = field_grid(&spec.lats.values(), &spec.lons.values(), linear_field);
        MaskedGrid::new(spec, data).unwrap()
    }

    #[test]
    fn test_two_by_two_midpoints_are_linear() {
        let out = sharpen(&grid(2, 2)).unwrap();
        assert_eq!((out.height(), out.width()), (3, 3));
        assert!(!out.has_mask());
        assert_eq!(out.spec.lats.values(), vec![20.0, 20.25, 20.5]);

        for (row, col) in [(1, 1), (0, 1), (2, 1), (1, 0), (1, 2)] {
            let (lat, lon) = out.coord(row, col);
            assert_approx_eq!(out.get(row, col).unwrap(), linear_field(lat, lon), 1e-9);
        }
        // Originals are carried over untouched.
        assert_eq!(out.get(2, 2), Some(linear_field(20.5, 280.5)));
    }

    #[test]
    fn test_masked_corner_leaves_cell_unfilled() {
        let mut mask = vec![false; 9];
        mask[0] = true;
        let input = grid(3, 3).with_mask(mask).unwrap();
        let out = sharpen(&input).unwrap();

        assert_eq!((out.height(), out.width()), (5, 5));
        assert!(out.has_mask());
        // The original masked point stays masked.
        assert!(out.is_masked(0, 0));
        // Centre of the lower-left cell is unfilled.
        assert!(out.is_masked(1, 1));
        // Its top edge is shared with no other cell.
        assert!(out.is_masked(0, 1));
        // Its right edge is shared with the valid lower-right cell.
        assert!(!out.is_masked(1, 2));
        // The upper-right cell is complete.
        let (lat, lon) = out.coord(3, 3);
        assert_approx_eq!(out.get(3, 3).unwrap(), linear_field(lat, lon), 1e-9);
    }

    #[test]
    fn test_masked_input_keeps_mask_even_when_complete() {
        let input = grid(2, 2).with_mask(vec![false; 4]).unwrap();
        let out = sharpen(&input).unwrap();
        assert!(out.has_mask());
        assert_eq!(out.masked_count(), 0);
    }

    #[test]
    fn test_single_row_cannot_fill_midpoints() {
        let out = sharpen(&grid(1, 3)).unwrap();
        assert_eq!((out.height(), out.width()), (1, 5));
        assert!(out.is_masked(0, 1));
        assert_eq!(out.get(0, 2), Some(linear_field(20.0, 280.5)));
    }
}
