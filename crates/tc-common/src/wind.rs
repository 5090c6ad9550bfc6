//! Wind-vector composition and height adjustment.

use serde::{Deserialize, Serialize};

/// How a wind direction is expressed, clockwise from north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindConvention {
    /// Direction the wind blows towards.
    Oceanographic,
    /// Direction the wind blows from.
    Meteorological,
}

/// Speed and direction (degrees in [0, 360)) from u/v components.
pub fn compose_wind(u: f64, v: f64, convention: WindConvention) -> (f64, f64) {
    let speed = u.hypot(v);
    let dir = match convention {
        WindConvention::Oceanographic => u.atan2(v).to_degrees(),
        WindConvention::Meteorological => (-u).atan2(-v).to_degrees(),
    };
    (speed, (dir + 360.0) % 360.0)
}

/// u/v components from speed and direction.
pub fn decompose_wind(speed: f64, direction: f64, convention: WindConvention) -> (f64, f64) {
    let rad = direction.to_radians();
    match convention {
        WindConvention::Oceanographic => (speed * rad.sin(), speed * rad.cos()),
        WindConvention::Meteorological => (-speed * rad.sin(), -speed * rad.cos()),
    }
}

/// Log-profile conversion of an anemometer-height wind speed to 10 m.
pub fn convert_to_10m(speed: f64, height: f64) -> f64 {
    let z0: f64 = if speed <= 7.0 { 0.0023 } else { 0.022 };
    let kz = (10.0 / z0).ln() / (height / z0).ln();
    speed * kz
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_compose_cardinal_directions() {
        let (spd, dir) = compose_wind(0.0, 5.0, WindConvention::Oceanographic);
        assert_approx_eq!(spd, 5.0, 1e-12);
        assert_approx_eq!(dir, 0.0, 1e-12);

        // Northward flow comes from the south.
        let (_, dir) = compose_wind(0.0, 5.0, WindConvention::Meteorological);
        assert_approx_eq!(dir, 180.0, 1e-12);

        let (_, dir) = compose_wind(-3.0, 0.0, WindConvention::Oceanographic);
        assert_approx_eq!(dir, 270.0, 1e-12);
    }

    #[test]
    fn test_decompose_inverts_compose() {
        for convention in [WindConvention::Oceanographic, WindConvention::Meteorological] {
            let (spd, dir) = compose_wind(3.0, -4.0, convention);
            let (u, v) = decompose_wind(spd, dir, convention);
            assert_approx_eq!(u, 3.0, 1e-9);
            assert_approx_eq!(v, -4.0, 1e-9);
        }
    }

    #[test]
    fn test_convert_to_10m() {
        assert_approx_eq!(convert_to_10m(12.0, 10.0), 12.0, 1e-12);
        // Lower anemometers read slower winds, so the 10 m value is larger.
        assert!(convert_to_10m(5.0, 4.0) > 5.0);
        assert!(convert_to_10m(20.0, 30.0) < 20.0);
    }
}
