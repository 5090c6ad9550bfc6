//! Sharpening followed by point resolution on ocean-style grids.

use grid_processor::{resolve, sharpen, CellLookup, CellMethod, GridProcessorError, MaskedGrid};
use tc_common::{GridAxis, GridSpec};
use test_utils::{assert_approx_eq, axis, field_grid, linear_field};

const FILL: f64 = -999.0;

/// A 0.5° sea-surface field over a 4x4 box whose north-west corner is land.
fn coastal_grid() -> MaskedGrid {
    let spec = GridSpec::new(
        "era5_0p50",
        GridAxis::new(24.0, 0.5, 4),
        GridAxis::new(270.0, 0.5, 4),
    );
    let lats = axis(24.0, 0.5, 4);
    let lons = axis(270.0, 0.5, 4);
    let mut data = field_grid(&lats, &lons, linear_field);
    // Row 3 is the northernmost latitude; columns 0..2 are land.
    data[3 * 4] = FILL;
    data[3 * 4 + 1] = FILL;
    MaskedGrid::from_sentinel(spec, data, FILL).unwrap()
}

// ============================================================================
// Sharpen then resolve
// ============================================================================

#[test]
fn test_sharpened_grid_resolves_like_original_over_ocean() {
    let coarse = coastal_grid();
    let fine = sharpen(&coarse).unwrap();

    assert_eq!((fine.height(), fine.width()), (7, 7));
    assert_eq!(fine.spec.lats.step, 0.25);

    for (lat, lon) in [(24.1, 270.1), (24.6, 271.3), (24.9, 270.9)] {
        let a = resolve(&coarse, lat, lon, CellLookup::Enclosing, CellMethod::Bilinear).unwrap();
        let b = resolve(&fine, lat, lon, CellLookup::Enclosing, CellMethod::Bilinear).unwrap();
        assert_approx_eq!(a, linear_field(lat, lon), 1e-9);
        assert_approx_eq!(b, linear_field(lat, lon), 1e-9);
    }
}

#[test]
fn test_land_stays_masked_after_sharpening() {
    let fine = sharpen(&coastal_grid()).unwrap();

    // Original land points.
    assert!(fine.is_masked(6, 0));
    assert!(fine.is_masked(6, 2));
    // Centre of the cell between row 2..3 and col 0..1.
    assert!(fine.is_masked(5, 1));

    let err = resolve(&fine, 25.45, 270.1, CellLookup::Enclosing, CellMethod::Bilinear).unwrap_err();
    assert!(matches!(err, GridProcessorError::MaskedData { .. }));
    assert!(err.is_recoverable());
}

#[test]
fn test_sharpened_ocean_near_coast_still_resolves() {
    let fine = sharpen(&coastal_grid()).unwrap();
    // South-east of the land corner every corner is ocean.
    let v = resolve(&fine, 25.3, 271.3, CellLookup::Enclosing, CellMethod::Bilinear).unwrap();
    assert_approx_eq!(v, linear_field(25.3, 271.3), 1e-9);
}
