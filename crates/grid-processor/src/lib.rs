//! Raster value resolution for gridded geophysical sources.
//!
//! Reanalysis and satellite composites arrive as regular lat/lon grids with
//! a missing-value sentinel. This crate wraps them in a [`MaskedGrid`],
//! locates the 2×2 cell around a target point, and derives a value from it:
//!
//! ```text
//! (lat, lon) ─► GridSpec::enclosing_cell / centered_cell
//!                    │
//!                    ├─► InvalidWindow (off grid)
//!                    ▼
//!              MaskedGrid::square ─► any corner masked ─► MaskedData
//!                    │
//!                    ▼
//!      bilinear_interpolate | area_mean ─► value
//! ```
//!
//! Coarse ocean grids can be densified with [`sharpen`] before lookup.

pub mod error;
pub mod interpolation;
pub mod resolver;
pub mod sharpen;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{GridProcessorError, Result};
pub use interpolation::{area_mean, bilinear_interpolate, interpolate, resolve_square};
pub use resolver::resolve;
pub use sharpen::sharpen;
pub use types::{CellLookup, CellMethod, CellSquare, MaskedGrid, RasterField};
