//! Stepped Frequency Microwave Radiometer (SFMR) along-track data.
//!
//! Raw variable arrays are decoded into [`TrackPoint`]s, summarised as a
//! [`TrackBrief`] per file, and reduced to one [`SquareAverage`] per
//! fixed-size square by [`TrackSegmenter`]. Reading files directly needs the
//! `netcdf` feature.

pub mod decode;
pub mod error;
#[cfg(feature = "netcdf")]
pub mod netcdf;
pub mod segment;
pub mod types;

// Re-export commonly used types at crate root
pub use decode::{date_from_file_name, SfmrArrays};
pub use error::{Result, SfmrError};
pub use segment::{Segmentation, SquareAverage, TrackSegmenter, DEFAULT_SQUARE_EDGE};
pub use types::{Quantities, Quantity, TrackBrief, TrackPoint};
