//! File-backed track loader and ERA5 raster source.
//!
//! Requires the `netcdf` feature and the system NetCDF/HDF5 libraries.
//!
//! SFMR files are laid out as `{root}/{year}/{hurricane}/{filename}`. ERA5
//! fields come from daily files `{root}/{yyyymmdd}_single.nc` and
//! `{root}/{yyyymmdd}_pressure.nc` holding 24 hourly steps, with variables
//! named after the feature-table columns.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use grid_processor::{MaskedGrid, RasterField};
use sfmr::{TrackBrief, TrackPoint};
use storage::{ERA5_PRESSURE_LEVEL_FIELDS, ERA5_SINGLE_LEVEL_FIELDS};
use tc_common::{GridAxis, GridSpec};
use tracing::{debug, warn};

use crate::error::{MatchupError, Result};
use crate::sources::{RasterSource, TrackLoader};

/// Loads SFMR tracks from a directory tree.
#[derive(Debug, Clone)]
pub struct DirTrackLoader {
    root: PathBuf,
}

impl DirTrackLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_of(&self, brief: &TrackBrief) -> PathBuf {
        self.root
            .join(brief.start.year().to_string())
            .join(&brief.hurricane)
            .join(&brief.filename)
    }
}

#[async_trait]
impl TrackLoader for DirTrackLoader {
    async fn load(&self, brief: &TrackBrief) -> Result<Vec<TrackPoint>> {
        let path = self.path_of(brief);
        let points = tokio::task::spawn_blocking(move || sfmr::netcdf::read_track(path))
            .await
            .map_err(|e| MatchupError::Source(format!("track reader panicked: {}", e)))??;
        Ok(points)
    }
}

/// ERA5 fields read from daily NetCDF files.
#[derive(Debug, Clone)]
pub struct Era5Files {
    root: PathBuf,
}

impl Era5Files {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn day_file(&self, day: NaiveDate, kind: &str) -> PathBuf {
        self.root.join(format!("{}_{}.nc", day.format("%Y%m%d"), kind))
    }
}

#[async_trait]
impl RasterSource for Era5Files {
    async fn fields(&self, day: NaiveDate, hour: u32) -> Result<Vec<RasterField>> {
        let single = self.day_file(day, "single");
        let pressure = self.day_file(day, "pressure");

        tokio::task::spawn_blocking(move || -> Result<Vec<RasterField>> {
            let mut fields = Vec::new();
            if single.exists() {
                fields.extend(read_era5_fields(&single, hour as usize, ERA5_SINGLE_LEVEL_FIELDS)?);
            } else {
                warn!(file = %single.display(), "ERA5 single-level file missing");
            }
            if pressure.exists() {
                fields.extend(read_era5_fields(&pressure, hour as usize, ERA5_PRESSURE_LEVEL_FIELDS)?);
            }
            Ok(fields)
        })
        .await
        .map_err(|e| MatchupError::Source(format!("ERA5 reader panicked: {}", e)))?
    }
}

fn read_error(path: &Path, message: impl std::fmt::Display) -> MatchupError {
    MatchupError::Source(format!("{}: {}", path.display(), message))
}

fn f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !var.attributes().any(|attr| attr.name() == name) {
        return None;
    }
    let value = var.attribute_value(name)?.ok()?;
    f64::try_from(value).ok()
}

fn read_axis(nc_file: &netcdf::File, path: &Path, name: &str) -> Result<Vec<f64>> {
    nc_file
        .variable(name)
        .ok_or_else(|| read_error(path, format!("missing variable {}", name)))?
        .get_values::<f64, _>(..)
        .map_err(|e| read_error(path, e))
}

/// Grid of one hourly slice, with rows flipped to ascending latitude.
///
/// NaN values are masked.
pub fn slice_to_grid(
    name: &str,
    lats: &[f64],
    lons: &[f64],
    slice: &[f64],
) -> Result<MaskedGrid> {
    let (height, width) = (lats.len(), lons.len());
    if height < 2 || width < 2 {
        return Err(MatchupError::Source(format!("{}: degenerate {}x{} grid", name, height, width)));
    }
    let descending = lats[0] > lats[height - 1];
    let lat_first = if descending { lats[height - 1] } else { lats[0] };
    let step = (lons[1] - lons[0]).abs();

    let mut data = Vec::with_capacity(height * width);
    for row in 0..height {
        let src = if descending { height - 1 - row } else { row };
        data.extend_from_slice(&slice[src * width..(src + 1) * width]);
    }

    let lon_axis = if ((width as f64) * step - 360.0).abs() < 1e-6 {
        GridAxis::periodic(lons[0], step)
    } else {
        GridAxis::new(lons[0], step, width)
    };
    let spec = GridSpec::new(name, GridAxis::new(lat_first, step, height), lon_axis);
    Ok(MaskedGrid::from_sentinel(spec, data, f64::NAN)?)
}

fn read_era5_fields(path: &Path, hour: usize, names: &[&str]) -> Result<Vec<RasterField>> {
    let nc_file = netcdf::open(path).map_err(|e| read_error(path, e))?;
    let lats = read_axis(&nc_file, path, "latitude")?;
    let lons = read_axis(&nc_file, path, "longitude")?;
    let levels: Option<Vec<u32>> = match nc_file.variable("level") {
        Some(var) => Some(
            var.get_values::<f64, _>(..)
                .map_err(|e| read_error(path, e))?
                .into_iter()
                .map(|l| l.round() as u32)
                .collect(),
        ),
        None => None,
    };
    let plane = lats.len() * lons.len();

    let mut fields = Vec::new();
    for name in names {
        let Some(var) = nc_file.variable(name) else {
            debug!(file = %path.display(), variable = name, "Variable not in file");
            continue;
        };
        let raw = var.get_values::<f64, _>(..).map_err(|e| read_error(path, e))?;
        let scale = f64_attr(&var, "scale_factor").unwrap_or(1.0);
        let offset = f64_attr(&var, "add_offset").unwrap_or(0.0);
        let fill = f64_attr(&var, "_FillValue").or_else(|| f64_attr(&var, "missing_value"));

        let unpack = |slice: &[f64]| -> Vec<f64> {
            slice
                .iter()
                .map(|v| if Some(*v) == fill { f64::NAN } else { v * scale + offset })
                .collect()
        };

        match &levels {
            Some(levels) => {
                for (li, level) in levels.iter().enumerate() {
                    let start = (hour * levels.len() + li) * plane;
                    let Some(slice) = raw.get(start..start + plane) else {
                        return Err(read_error(path, format!("{} has no step for hour {}", name, hour)));
                    };
                    let grid = slice_to_grid(name, &lats, &lons, &unpack(slice))?;
                    fields.push(RasterField::new(*name, grid).at_level(*level));
                }
            }
            None => {
                let start = hour * plane;
                let Some(slice) = raw.get(start..start + plane) else {
                    return Err(read_error(path, format!("{} has no step for hour {}", name, hour)));
                };
                let grid = slice_to_grid(name, &lats, &lons, &unpack(slice))?;
                fields.push(RasterField::new(*name, grid));
            }
        }
    }

    debug!(file = %path.display(), hour, fields = fields.len(), "Read ERA5 fields");
    Ok(fields)
}
