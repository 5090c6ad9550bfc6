//! Matchup engine configuration.

use serde::{Deserialize, Serialize};

/// ERA5 pressure levels (hPa) a feature row may be attached to.
pub fn default_pressure_levels() -> Vec<u32> {
    vec![1000, 975, 950, 925, 900, 875, 850]
}

/// Configuration for storm matchups and feature building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchupConfig {
    /// Edge of the hourly box around each interpolated storm centre, in degrees.
    pub regression_edge_deg: f64,

    /// Edge of the squares SFMR tracks are averaged over, in degrees.
    pub square_edge_deg: f64,

    /// Longitude jump above which two positions are taken to straddle 0/360.
    pub antimeridian_threshold_deg: f64,

    /// Observations within this many minutes of an hour belong to it.
    pub temporal_tolerance_mins: i64,

    /// Square averages slower than this are discarded unless `use_slow_wind`.
    pub min_sfmr_windspd: f64,

    pub use_slow_wind: bool,

    /// Height in metres the SFMR wind speeds refer to; stored speeds are at 10 m.
    pub sfmr_wind_height_m: f64,

    /// Rows per bulk-insert batch.
    pub insert_batch_size: usize,

    /// Basin suffix of every table name, e.g. `na`.
    pub basin: String,

    /// Candidate pressure levels, hPa.
    pub pressure_levels: Vec<u32>,
}

impl Default for MatchupConfig {
    fn default() -> Self {
        Self {
            regression_edge_deg: 1.0,
            square_edge_deg: 0.25,
            antimeridian_threshold_deg: 20.0,
            temporal_tolerance_mins: 30,
            min_sfmr_windspd: 15.0,
            use_slow_wind: false,
            sfmr_wind_height_m: 10.0,
            insert_batch_size: 1000,
            basin: "na".to_string(),
            pressure_levels: default_pressure_levels(),
        }
    }
}

impl MatchupConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("REGRESSION_EDGE_DEG") {
            if let Ok(edge) = val.parse() {
                config.regression_edge_deg = edge;
            }
        }

        if let Ok(val) = std::env::var("SQUARE_EDGE_DEG") {
            if let Ok(edge) = val.parse() {
                config.square_edge_deg = edge;
            }
        }

        if let Ok(val) = std::env::var("ANTIMERIDIAN_THRESHOLD_DEG") {
            if let Ok(threshold) = val.parse() {
                config.antimeridian_threshold_deg = threshold;
            }
        }

        if let Ok(val) = std::env::var("MIN_SFMR_WINDSPD") {
            if let Ok(speed) = val.parse() {
                config.min_sfmr_windspd = speed;
            }
        }

        if let Ok(val) = std::env::var("USE_SLOW_WIND") {
            config.use_slow_wind = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("SFMR_WIND_HEIGHT_M") {
            if let Ok(height) = val.parse() {
                config.sfmr_wind_height_m = height;
            }
        }

        if let Ok(val) = std::env::var("INSERT_BATCH_SIZE") {
            if let Ok(size) = val.parse() {
                config.insert_batch_size = size;
            }
        }

        if let Ok(val) = std::env::var("BASIN") {
            config.basin = val.to_lowercase();
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.regression_edge_deg > 0.0) {
            return Err("regression_edge_deg must be > 0".to_string());
        }

        if !(self.square_edge_deg > 0.0) {
            return Err("square_edge_deg must be > 0".to_string());
        }

        if !(self.antimeridian_threshold_deg > 0.0 && self.antimeridian_threshold_deg < 180.0) {
            return Err("antimeridian_threshold_deg must be in (0, 180)".to_string());
        }

        if self.temporal_tolerance_mins <= 0 || self.temporal_tolerance_mins > 30 {
            return Err("temporal_tolerance_mins must be 1-30".to_string());
        }

        if !(self.sfmr_wind_height_m > 0.0) {
            return Err("sfmr_wind_height_m must be > 0".to_string());
        }

        if self.insert_batch_size == 0 {
            return Err("insert_batch_size must be > 0".to_string());
        }

        if self.basin.is_empty() || !self.basin.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err("basin must be a non-empty alphanumeric name".to_string());
        }

        if self.pressure_levels.is_empty() {
            return Err("pressure_levels must not be empty".to_string());
        }

        Ok(())
    }

    pub fn half_regression_edge(&self) -> f64 {
        self.regression_edge_deg / 2.0
    }

    /// Whether an averaged SFMR wind speed is trustworthy enough to keep.
    pub fn keeps_windspd(&self, windspd: f64) -> bool {
        windspd != 0.0 && (self.use_slow_wind || windspd >= self.min_sfmr_windspd)
    }
}
