//! Input resolution: normalise a user-supplied path or URL to a local file.
//!
//! ## Why download to a scratch file?
//!
//! The upload stage needs the full byte count and content MD5 before it can
//! ask for an upload slot, so remote files are fetched completely first.
//! The scratch file is owned by [`AcquiredFile`]: it is removed by
//! [`AcquiredFile::release`] or, on any early return or panic, when the
//! guard is dropped.

use crate::config::EsignConfig;
use crate::error::{EsignError, Result};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// A file ready to be read from the local file system.
#[derive(Debug)]
pub enum AcquiredFile {
    /// Input was already a local path; nothing to clean up.
    Local(PathBuf),
    /// Input was a URL; bytes live in a scratch file until released.
    Downloaded { url: String, file: NamedTempFile },
}

impl AcquiredFile {
    /// Path to read the file from, however it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            AcquiredFile::Local(p) => p,
            AcquiredFile::Downloaded { file, .. } => file.path(),
        }
    }

    /// Whether this guard owns a scratch file.
    pub fn is_scratch(&self) -> bool {
        matches!(self, AcquiredFile::Downloaded { .. })
    }

    /// Delete the scratch file now. A no-op for local inputs.
    pub fn release(self) {
        if let AcquiredFile::Downloaded { url, file } = self {
            let path = file.path().to_path_buf();
            match file.close() {
                Ok(()) => debug!("Removed scratch file {} for {}", path.display(), url),
                Err(e) => warn!("Failed to remove scratch file {}: {}", path.display(), e),
            }
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve `input` to a local file.
///
/// URLs are downloaded into `config.scratch_dir`; local paths are returned
/// unchanged without touching the file system.
pub async fn resolve_input(input: &str, config: &EsignConfig) -> Result<AcquiredFile> {
    if is_url(input) {
        download_url(input, config).await
    } else {
        Ok(AcquiredFile::Local(PathBuf::from(input)))
    }
}

/// Download a URL into a uniquely named scratch file.
async fn download_url(url: &str, config: &EsignConfig) -> Result<AcquiredFile> {
    info!("Downloading remote file from: {}", url);

    let failed = |reason: String| EsignError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.download_timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            failed(format!("timed out after {}s", config.download_timeout_secs))
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

    // Millisecond prefix plus tempfile's random suffix keeps concurrent
    // downloads from colliding.
    let prefix = format!("download-{}-", chrono::Utc::now().timestamp_millis());
    let file = tempfile::Builder::new()
        .prefix(&prefix)
        .tempfile_in(&config.scratch_dir)
        .map_err(|e| EsignError::io(&config.scratch_dir, e))?;

    tokio::fs::write(file.path(), &bytes)
        .await
        .map_err(|e| EsignError::io(file.path(), e))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file.path().display());

    Ok(AcquiredFile::Downloaded {
        url: url.to_string(),
        file,
    })
}
