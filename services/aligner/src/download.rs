//! Single-attempt downloads through a scoped partial file.
//!
//! Bytes are streamed into a temporary file inside the temp directory. The
//! file is removed whenever the guard is dropped without being persisted,
//! which covers errors, cancellation and Ctrl-C. On success it is renamed
//! onto its final path in one step.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

/// A download in progress; deleted on drop unless persisted.
pub struct PartialDownload {
    file: NamedTempFile,
    final_path: PathBuf,
    written: u64,
}

impl PartialDownload {
    /// Start a partial file in `temp_dir` destined for `final_path`.
    pub fn create(temp_dir: &Path, final_path: impl Into<PathBuf>) -> Result<Self> {
        std::fs::create_dir_all(temp_dir)
            .with_context(|| format!("Failed to create {}", temp_dir.display()))?;
        let file = tempfile::Builder::new()
            .suffix(".partial")
            .tempfile_in(temp_dir)
            .context("Failed to create partial download file")?;

        Ok(Self {
            file,
            final_path: final_path.into(),
            written: 0,
        })
    }

    pub fn temp_path(&self) -> &Path {
        self.file.path()
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        self.file
            .write_all(chunk)
            .context("Error writing to partial file")?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Flush and move the file onto its final path.
    pub fn persist(mut self) -> Result<PathBuf> {
        self.file.flush()?;
        self.file.as_file().sync_all()?;
        if let Some(parent) = self.final_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.file
            .persist(&self.final_path)
            .map_err(|e| anyhow!("Failed to persist {}: {}", self.final_path.display(), e.error))?;
        Ok(self.final_path)
    }
}

/// Downloads files with one attempt each.
pub struct Downloader {
    client: Client,
    temp_dir: PathBuf,
    output_dir: PathBuf,
}

impl Downloader {
    pub fn new(temp_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            temp_dir: temp_dir.into(),
            output_dir: output_dir.into(),
        })
    }

    /// Fetch `url` into `{output_dir}/{filename}`.
    ///
    /// An existing final file is kept as is.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &str, filename: &str) -> Result<PathBuf> {
        let final_path = self.output_dir.join(filename);
        if final_path.exists() {
            info!(path = %final_path.display(), "File already exists, skipping download");
            return Ok(final_path);
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("HTTP request failed")?;
        if response.status() != StatusCode::OK {
            return Err(anyhow!("HTTP error: {}", response.status()));
        }

        let mut partial = PartialDownload::create(&self.temp_dir, &final_path)?;
        debug!(temp = %partial.temp_path().display(), "Streaming to partial file");

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Error reading response chunk")?;
            partial.write_chunk(&chunk)?;
        }

        let bytes = partial.written();
        let path = partial.persist()?;
        info!(path = %path.display(), bytes, "Download completed");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropped_download_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("out/era5.nc");

        let temp_path = {
            let mut partial = PartialDownload::create(&dir.path().join("tmp"), &final_path).unwrap();
            partial.write_chunk(b"half a file").unwrap();
            let path = partial.temp_path().to_path_buf();
            assert!(path.exists());
            path
        };

        assert!(!temp_path.exists());
        assert!(!final_path.exists());
    }

    #[test]
    fn test_persisted_download_moves_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("out/era5.nc");

        let mut partial = PartialDownload::create(&dir.path().join("tmp"), &final_path).unwrap();
        partial.write_chunk(b"abc").unwrap();
        partial.write_chunk(b"def").unwrap();
        assert_eq!(partial.written(), 6);
        let temp_path = partial.temp_path().to_path_buf();

        let path = partial.persist().unwrap();
        assert_eq!(path, final_path);
        assert_eq!(std::fs::read(&final_path).unwrap(), b"abcdef");
        assert!(!temp_path.exists());
    }

    #[tokio::test]
    async fn test_existing_file_is_not_fetched() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("done.nc"), b"x").unwrap();
        let downloader = Downloader::new(dir.path().join("tmp"), dir.path()).unwrap();

        // The URL is never contacted.
        let path = downloader.fetch("http://127.0.0.1:9/done.nc", "done.nc").await.unwrap();
        assert_eq!(path, dir.path().join("done.nc"));
    }
}
