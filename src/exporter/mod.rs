//! Export pipeline split into focused submodules.
//!
//! The `LayerExporter` struct and its methods are organized by stage:
//! - [`register`] - Export key pair load/generation and registration
//! - [`request`] - Reuse of today's export or creation of a new one
//! - [`archive`] - Status polling, archive download and the decryption handoff
//! - [`attachments`] - Attachment download and manifest rewrite

mod archive;
mod attachments;
mod register;
mod request;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use request::{parse_created_date, select_reusable_export};

use crate::client::ApiClient;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::handoff::DecryptionHandoff;
use crate::types::{AppId, BearerToken, Event, ExportSummary};
use crate::utils::ensure_dir;
use std::sync::Arc;

/// Exports one Layer application to local disk
///
/// Holds the run context shared by every stage: configuration, the authenticated API
/// client and the event channel. Stages run strictly one after another.
#[derive(Clone, Debug)]
pub struct LayerExporter {
    /// Configuration (wrapped in Arc so clones share it)
    pub(crate) config: Arc<Config>,
    /// Authenticated platform client
    pub(crate) client: ApiClient,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
}

impl LayerExporter {
    /// Create an exporter for `app_id`, authenticating with `token`
    ///
    /// `app_id` may be URI-shaped; only its final path segment is used. Nothing is
    /// sent to the platform until [`run`](Self::run) (or an individual stage) is called.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the HTTP client cannot be built
    pub fn new(config: Config, app_id: &str, token: BearerToken) -> Result<Self> {
        config.validate()?;

        let app_id = AppId::new(app_id);
        if app_id.as_str().is_empty() {
            return Err(Error::Config {
                message: "app id is empty after normalization".to_string(),
                key: Some("app_id".to_string()),
            });
        }

        let client = ApiClient::new(&config.api, app_id, token)?;

        // Buffer sized for a large manifest's worth of attachment events
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        Ok(Self {
            config: Arc::new(config),
            client,
            event_tx,
        })
    }

    /// Subscribe to export events
    ///
    /// Multiple subscribers are supported. A subscriber that falls more than 1000
    /// events behind receives `RecvError::Lagged`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Normalized application id
    pub fn app_id(&self) -> &AppId {
        self.client.app_id()
    }

    /// Run the whole export pipeline
    ///
    /// Registers the key, requests (or reuses) an export, waits for it, downloads the
    /// encrypted archive, hands off to `handoff` for manual decryption, and finally
    /// resolves the manifest's attachments. Any error aborts the run immediately;
    /// files written by earlier stages are left in place.
    pub async fn run(&self, handoff: &dyn DecryptionHandoff) -> Result<ExportSummary> {
        self.prepare_directories().await?;

        let keys = self.register_key().await?;
        let request = self.request_export().await?;

        let polled = self.wait_for_export(&request.export_id).await?;
        let params = self.download_archive(&request.export_id, &polled.value).await?;
        self.hand_off(handoff, &params).await?;

        let attachments = self.resolve_attachments().await?;

        tracing::info!(
            export_id = %request.export_id,
            attachments,
            "export complete"
        );

        Ok(ExportSummary {
            export_id: request.export_id,
            reused_export: request.reused,
            generated_keys: keys.generated,
            polls_waited: polled.waits,
            archive_path: params.archive_path,
            attachments,
        })
    }

    /// Create the export and downloads directories
    pub async fn prepare_directories(&self) -> Result<()> {
        let downloads_dir = self.config.paths.downloads_dir();
        ensure_dir(&downloads_dir).await.map_err(|e| match e {
            Error::Io(io) => Error::Io(std::io::Error::new(
                io.kind(),
                format!(
                    "Failed to create downloads directory '{}': {}",
                    downloads_dir.display(),
                    io
                ),
            )),
            other => other,
        })
    }

    pub(crate) fn emit(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }
}
