//! Discovery and brief indexing of SFMR files on disk.

use std::path::{Path, PathBuf};

use anyhow::Result;
use sfmr::{date_from_file_name, TrackBrief};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// One SFMR file found under the data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SfmrFile {
    pub year: i32,
    pub hurricane: String,
    pub filename: String,
    pub path: PathBuf,
}

/// Find `{year}/{hurricane}/*.nc` files whose names carry an SFMR date.
///
/// Results are sorted by path; `year` restricts the walk to one year.
pub fn discover_sfmr_files(root: &Path, year: Option<i32>) -> Vec<SfmrFile> {
    let mut files: Vec<SfmrFile> = WalkDir::new(root)
        .min_depth(3)
        .max_depth(3)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let rel = entry.path().strip_prefix(root).ok()?;
            let mut parts = rel.iter().map(|p| p.to_string_lossy().into_owned());
            let file_year: i32 = parts.next()?.parse().ok()?;
            let hurricane = parts.next()?;
            let name = parts.next()?;
            if !name.ends_with(".nc") || year.is_some_and(|y| y != file_year) {
                return None;
            }
            if date_from_file_name(&name).is_none() {
                debug!(file = %name, "No SFMR date in file name");
                return None;
            }
            Some(SfmrFile {
                year: file_year,
                hurricane,
                filename: name,
                path: entry.path().to_path_buf(),
            })
        })
        .collect();

    files.sort_by(|a, b| a.path.cmp(&b.path));
    files
}

/// Read every file and build its brief; unreadable files are skipped.
pub async fn read_briefs(files: Vec<SfmrFile>) -> Result<(Vec<TrackBrief>, usize)> {
    let briefs = tokio::task::spawn_blocking(move || {
        let mut briefs = Vec::with_capacity(files.len());
        let mut skipped = 0usize;
        for file in files {
            match sfmr::netcdf::read_track(&file.path) {
                Ok(points) => match TrackBrief::from_points(&file.hurricane, &file.filename, &points) {
                    Some(brief) => briefs.push(brief),
                    None => {
                        debug!(file = %file.path.display(), "Track has no valid records");
                        skipped += 1;
                    }
                },
                Err(e) => {
                    warn!(file = %file.path.display(), error = %e, "Skipping unreadable SFMR file");
                    skipped += 1;
                }
            }
        }
        (briefs, skipped)
    })
    .await?;
    Ok(briefs)
}
