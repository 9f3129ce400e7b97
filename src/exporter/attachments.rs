//! Attachment download and manifest rewrite.
//!
//! The decrypted manifest is a JSON array of items, each with a `messages` array whose
//! messages may carry `parts`. A part whose `content.download_url` is a remote URL has
//! that file downloaded to `downloads/<n>` and the URL replaced by the integer `n`.
//! Numbers start at 1 and follow traversal order (items, then messages, then parts).

use crate::error::{Error, Result};
use crate::types::Event;
use crate::utils::download_to_file;
use serde_json::Value;
use std::path::Path;

use super::LayerExporter;

impl LayerExporter {
    /// Download every attachment referenced by the manifest and rewrite it in place
    ///
    /// The manifest is read from `export/export.json`, which the operator produces by
    /// decrypting and extracting the archive. It is written back only after every
    /// attachment has been downloaded; a failure part way leaves the manifest untouched
    /// and the attachments downloaded so far on disk.
    ///
    /// # Returns
    ///
    /// Number of attachments downloaded.
    pub async fn resolve_attachments(&self) -> Result<u64> {
        tracing::info!("Getting downloads");

        let manifest_path = self.config.paths.manifest_path();
        let raw = tokio::fs::read(&manifest_path).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to read manifest '{}': {}",
                    manifest_path.display(),
                    e
                ),
            ))
        })?;
        let mut manifest: Value = serde_json::from_slice(&raw).map_err(|e| Error::InvalidManifest {
            path: manifest_path.clone(),
            reason: e.to_string(),
        })?;

        let downloaded = self.download_attachments(&mut manifest, &manifest_path).await?;

        tokio::fs::write(&manifest_path, serde_json::to_vec(&manifest)?).await?;
        tracing::info!(
            path = %manifest_path.display(),
            attachments = downloaded,
            "manifest rewritten"
        );
        self.emit(Event::ManifestRewritten {
            path: manifest_path,
            attachments: downloaded,
        });

        Ok(downloaded)
    }

    async fn download_attachments(
        &self,
        manifest: &mut Value,
        manifest_path: &Path,
    ) -> Result<u64> {
        let downloads_dir = self.config.paths.downloads_dir();
        let invalid = |reason: String| Error::InvalidManifest {
            path: manifest_path.to_path_buf(),
            reason,
        };

        let items = manifest
            .as_array_mut()
            .ok_or_else(|| invalid("top-level value is not an array".to_string()))?;

        let mut next: u64 = 1;
        for (item_index, item) in items.iter_mut().enumerate() {
            let messages = item
                .get_mut("messages")
                .and_then(Value::as_array_mut)
                .ok_or_else(|| invalid(format!("item {} has no messages array", item_index)))?;

            for message in messages.iter_mut() {
                let Some(parts) = message.get_mut("parts").and_then(Value::as_array_mut) else {
                    continue;
                };

                for part in parts.iter_mut() {
                    let Some(slot) = part
                        .get_mut("content")
                        .and_then(|content| content.get_mut("download_url"))
                    else {
                        continue;
                    };
                    // Integers are references rewritten by an earlier run
                    let Some(url) = slot.as_str().filter(|url| !url.is_empty()) else {
                        continue;
                    };

                    let dest = downloads_dir.join(next.to_string());
                    let bytes = download_to_file(self.client.http(), url, &dest).await?;
                    tracing::debug!(
                        index = next,
                        path = %dest.display(),
                        bytes,
                        "attachment downloaded"
                    );
                    self.emit(Event::AttachmentDownloaded {
                        index: next,
                        path: dest,
                        bytes,
                    });

                    *slot = Value::from(next);
                    next += 1;
                }
            }
        }

        Ok(next - 1)
    }
}
