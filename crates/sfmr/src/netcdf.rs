//! Reading SFMR NetCDF files.
//!
//! Requires the `netcdf` feature and the system NetCDF/HDF5 libraries.

use std::path::Path;

use tracing::debug;

use crate::decode::SfmrArrays;
use crate::error::{Result, SfmrError};
use crate::types::{Quantity, TrackPoint};

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_f64(nc_file: &netcdf::File, file: &str, name: &str) -> Result<Vec<f64>> {
    let var = nc_file
        .variable(name)
        .ok_or_else(|| SfmrError::MissingVariable {
            file: file.to_string(),
            variable: name.to_string(),
        })?;
    var.get_values::<f64, _>(..).map_err(|e| SfmrError::Read {
        file: file.to_string(),
        message: format!("{}: {}", name, e),
    })
}

fn read_i64(nc_file: &netcdf::File, file: &str, name: &str) -> Result<Vec<i64>> {
    let var = nc_file
        .variable(name)
        .ok_or_else(|| SfmrError::MissingVariable {
            file: file.to_string(),
            variable: name.to_string(),
        })?;
    var.get_values::<i64, _>(..).map_err(|e| SfmrError::Read {
        file: file.to_string(),
        message: format!("{}: {}", name, e),
    })
}

/// Read the raw variable arrays of an SFMR file.
pub fn read_sfmr_file(path: impl AsRef<Path>) -> Result<SfmrArrays> {
    let path = path.as_ref();
    let file = file_label(path);

    let nc_file = netcdf::open(path).map_err(|e| SfmrError::Read {
        file: file.clone(),
        message: format!("Failed to open NetCDF: {}", e),
    })?;

    let mut arrays = SfmrArrays {
        date: read_i64(&nc_file, &file, "DATE")?,
        time: read_i64(&nc_file, &file, "TIME")?,
        lat: read_f64(&nc_file, &file, "LAT")?,
        lon: read_f64(&nc_file, &file, "LON")?,
        ..SfmrArrays::default()
    };
    for q in Quantity::ALL {
        arrays.quantities[q as usize] = read_f64(&nc_file, &file, q.nc_variable())?;
    }
    if nc_file.variable("FLAG").is_some() {
        arrays.flag = Some(read_i64(&nc_file, &file, "FLAG")?);
    }

    debug!(file = %file, records = arrays.len(), flagged = arrays.flag.is_some(), "read SFMR file");
    Ok(arrays)
}

/// Read and decode an SFMR file into track points.
pub fn read_track(path: impl AsRef<Path>) -> Result<Vec<TrackPoint>> {
    let path = path.as_ref();
    read_sfmr_file(path)?.decode(&file_label(path))
}
