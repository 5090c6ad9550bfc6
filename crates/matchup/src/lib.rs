//! Storm-centred matchup of along-track observations with reanalysis grids.
//!
//! For every pair of consecutive storm fixes the [`MatchupEngine`]
//! interpolates hourly centres, asks a [`BriefIndex`] which SFMR files
//! overlap the interval in time and space, and square-averages the track
//! points that fall near each centre. Matched hours become
//! [`AlignedFeatureRow`]s, which are aligned with ERA5 fields and bulk
//! loaded into the feature tables by [`run_storm`].

pub mod config;
pub mod engine;
pub mod error;
pub mod features;
#[cfg(feature = "netcdf")]
pub mod files;
pub mod fix;
pub mod pg;
pub mod pipeline;
pub mod records;
pub mod sources;

// Re-export commonly used types at crate root
pub use config::{default_pressure_levels, MatchupConfig};
pub use engine::{
    BriefAverages, HourOutcome, IntervalOutcome, MatchState, MatchupEngine, UnmatchedReason,
};
pub use error::{MatchupError, Result};
pub use features::{
    attach_pressure_levels, attach_single_levels, offset_in_cells, select_pressure_level,
    sfmr_feature_rows, AlignedFeatureRow, AttachOutcome, RasterAttachment,
};
#[cfg(feature = "netcdf")]
pub use files::{DirTrackLoader, Era5Files};
pub use fix::{center_shift, interpolate_fixes, InterpolatedFix, StormFix, WindRadii};
pub use pg::{PgBriefIndex, PgFixSource, DEFAULT_FIX_TABLE};
pub use pipeline::{attach_rasters, index_briefs, run_storm, AttachSummary, StormReport, STORM_SOURCE};
pub use records::{brief_from_row, brief_row, MatchRecord, KEY_TIME_FORMAT};
pub use sources::{
    BriefIndex, FixSource, RasterSource, StaticBriefIndex, StaticFixSource, StaticRasters,
    StaticTrackLoader, TrackLoader,
};
