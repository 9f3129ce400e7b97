//! Utility functions for downloads and file placement

use crate::error::{Result, platform_error};
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Download `url` to `dest`, overwriting any existing file
///
/// Signed download URLs carry their own authorization, so no platform headers are
/// sent. The body is written chunk by chunk as it arrives.
///
/// # Returns
///
/// Number of bytes written.
///
/// # Errors
///
/// A non-success status becomes a [`PlatformError`](crate::error::PlatformError);
/// transport and file system failures propagate as-is. A failed download may leave a
/// partial file behind.
pub async fn download_to_file(http: &reqwest::Client, url: &str, dest: &Path) -> Result<u64> {
    tracing::debug!(url = %url, path = %dest.display(), "downloading");

    let mut response = http.get(url).send().await?;
    if !response.status().is_success() {
        return Err(platform_error(response).await);
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(written)
}

/// Create `dir` and its parents if they do not exist yet
pub async fn ensure_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}
