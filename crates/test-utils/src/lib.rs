//! Shared test helpers for the tc-align workspace.
//!
//! - float and longitude assertions tolerant of rounding
//! - synthetic grids and SFMR-like tracks ([`generators`])
//! - fixed timestamps ([`fixtures`])
//!
//! Only plain tuples and vectors cross this crate's API, so every workspace
//! member can take it as a dev-dependency without a cycle.

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;

/// Default tolerance of [`assert_approx_eq!`] when none is given.
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// Shortest signed distance between two longitudes, in degrees.
pub fn lon_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Assert two floats differ by at most an epsilon ([`DEFAULT_EPSILON`]
/// when omitted).
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr) => {
        $crate::assert_approx_eq!($left, $right, $crate::DEFAULT_EPSILON)
    };
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right, epsilon) = ($left as f64, $right as f64, $epsilon as f64);
        if !((left - right).abs() <= epsilon) {
            panic!(
                "{} ≉ {}: {} vs {} (|diff| {:e} > {:e})",
                stringify!($left),
                stringify!($right),
                left,
                right,
                (left - right).abs(),
                epsilon
            );
        }
    }};
}

/// Assert two `(lon, lat)` pairs are close, treating longitudes on a circle.
#[macro_export]
macro_rules! assert_coords_approx_eq {
    (($lon1:expr, $lat1:expr), ($lon2:expr, $lat2:expr), $epsilon:expr) => {{
        let d = $crate::lon_distance($lon1 as f64, $lon2 as f64);
        if d.abs() > $epsilon as f64 {
            panic!("longitudes {} and {} are {:e}° apart", $lon1, $lon2, d);
        }
        $crate::assert_approx_eq!($lat1, $lat2, $epsilon);
    }};
}
