//! Common types and utilities shared across the tc-align crates.
//!
//! Grids and their indexers, spatial windows, bounding boxes, hourly
//! rounding and bucketing, and wind-vector helpers.

pub mod bbox;
pub mod error;
pub mod grid;
pub mod time;
pub mod wind;

pub use bbox::BoundingBox;
pub use error::{TcError, TcResult};
pub use grid::{
    grids, nearest_index, normalize_lon, range_bound_index, CellIndex, GridAxis, GridKind,
    GridPoint, GridSpec, RangeBound, SubsetWindow,
};
pub use time::{
    bucket_by_hour, bucket_by_hour_on, ceil_to_hour, floor_to_hour, hours_between,
    minutes_from_hour, round_to_hour, HourBuckets, TimeRange,
};
pub use wind::{compose_wind, convert_to_10m, decompose_wind, WindConvention};
