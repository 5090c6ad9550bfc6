//! Cell value resolution over a 2×2 neighbourhood.

use crate::error::{GridProcessorError, Result};
use crate::types::{CellMethod, CellSquare};

/// Bilinear interpolation inside one square.
///
/// Fails with `MaskedData` if any corner is masked, and with
/// `InvalidInterpolationSquare` if the square has zero width or height.
/// The result passes exactly through the four corner values.
pub fn bilinear_interpolate(square: &CellSquare, lat: f64, lon: f64) -> Result<f64> {
    let [[v00, v01], [v10, v11]] = square
        .valid_values()
        .ok_or(GridProcessorError::MaskedData { lat, lon })?;

    let dlat = square.lats[1] - square.lats[0];
    let dlon = square.lons[1] - square.lons[0];
    if dlat == 0.0 || dlon == 0.0 {
        return Err(GridProcessorError::invalid_square(format!(
            "degenerate square lats={:?} lons={:?}",
            square.lats, square.lons
        )));
    }

    let ty = (lat - square.lats[0]) / dlat;
    let tx = (lon - square.lons[0]) / dlon;

    let bottom = v00 * (1.0 - tx) + v01 * tx;
    let top = v10 * (1.0 - tx) + v11 * tx;
    Ok(bottom * (1.0 - ty) + top * ty)
}

/// Arithmetic mean of the four corners; fails if any corner is masked.
pub fn area_mean(square: &CellSquare, lat: f64, lon: f64) -> Result<f64> {
    let values = square
        .valid_values()
        .ok_or(GridProcessorError::MaskedData { lat, lon })?;
    Ok(values.iter().flatten().sum::<f64>() / 4.0)
}

/// Resolve a square with the given method.
pub fn resolve_square(square: &CellSquare, lat: f64, lon: f64, method: CellMethod) -> Result<f64> {
    match method {
        CellMethod::Bilinear => bilinear_interpolate(square, lat, lon),
        CellMethod::AreaMean => area_mean(square, lat, lon),
    }
}

/// Interpolate from loosely shaped input, as handed over by a decoder.
///
/// Anything other than exactly 2 latitudes, 2 longitudes and 2×2 values is
/// rejected as an invalid square.
pub fn interpolate(
    values: &[Vec<Option<f64>>],
    lats: &[f64],
    lons: &[f64],
    lat: f64,
    lon: f64,
) -> Result<f64> {
    let square = CellSquare::from_slices(values, lats, lons)?;
    bilinear_interpolate(&square, lat, lon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, linear_field};

    fn linear_square() -> CellSquare {
        let lats = [20.0, 20.5];
        let lons = [280.0, 280.5];
        let mut values = [[None; 2]; 2];
        for i in 0..2 {
            for j in 0..2 {
                values[i][j] = Some(linear_field(lats[i], lons[j]));
            }
        }
        CellSquare { lats, lons, values }
    }

    #[test]
    fn test_passes_through_corners() {
        let sq = linear_square();
        for i in 0..2 {
            for j in 0..2 {
                let v = bilinear_interpolate(&sq, sq.lats[i], sq.lons[j]).unwrap();
                assert_eq!(v, sq.values[i][j].unwrap());
            }
        }
    }

    #[test]
    fn test_reproduces_linear_field_inside() {
        let sq = linear_square();
        let v = bilinear_interpolate(&sq, 20.1, 280.37).unwrap();
        assert_approx_eq!(v, linear_field(20.1, 280.37), 1e-9);
    }

    #[test]
    fn test_masked_corner_is_invalid() {
        let mut sq = linear_square();
        sq.values[1][0] = None;
        let err = bilinear_interpolate(&sq, 20.25, 280.25).unwrap_err();
        assert!(matches!(err, GridProcessorError::MaskedData { .. }));
        assert!(area_mean(&sq, 20.25, 280.25).is_err());
    }

    #[test]
    fn test_area_mean() {
        let sq = linear_square();
        let mean = area_mean(&sq, 20.25, 280.25).unwrap();
        assert_approx_eq!(mean, linear_field(20.25, 280.25), 1e-9);
    }

    #[test]
    fn test_degenerate_square() {
        let mut sq = linear_square();
        sq.lons = [280.0, 280.0];
        assert!(matches!(
            bilinear_interpolate(&sq, 20.0, 280.0),
            Err(GridProcessorError::InvalidInterpolationSquare(_))
        ));
    }

    #[test]
    fn test_interpolate_requires_two_by_two() {
        let values = vec![vec![Some(1.0), Some(2.0)]];
        assert!(matches!(
            interpolate(&values, &[0.0, 1.0], &[0.0, 1.0], 0.5, 0.5),
            Err(GridProcessorError::InvalidInterpolationSquare(_))
        ));

        let values = vec![vec![Some(0.0), Some(1.0)], vec![Some(2.0), Some(3.0)]];
        let v = interpolate(&values, &[0.0, 1.0], &[0.0, 1.0], 0.5, 0.5).unwrap();
        assert_approx_eq!(v, 1.5, 1e-12);
    }
}
