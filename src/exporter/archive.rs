//! Export status polling, archive download and the manual decryption handoff.

use crate::error::{Error, Result};
use crate::handoff::DecryptionHandoff;
use crate::poll::{Polled, poll_until_ready};
use crate::types::{DecryptionParams, Event, ExportStatus};
use crate::utils::download_to_file;

use super::LayerExporter;

impl LayerExporter {
    /// Poll the export's status until it has a download URL
    ///
    /// Sleeps `polling.interval` between checks. With the default configuration this
    /// waits for as long as the platform takes.
    pub async fn wait_for_export(&self, export_id: &str) -> Result<Polled<ExportStatus>> {
        tracing::info!(export_id = %export_id, "Getting export");
        let suffix = format!("exports/{}/status", export_id);

        poll_until_ready(
            &self.config.polling,
            |attempt| {
                let suffix = suffix.as_str();
                async move {
                    let status: ExportStatus = self.client.get(suffix).await?.json()?;
                    tracing::debug!(
                        export_id = %export_id,
                        attempt,
                        status = ?status,
                        "export status"
                    );
                    Ok::<_, Error>(status.ready_url().is_some().then_some(status))
                }
            },
            |attempt| {
                tracing::info!(
                    export_id = %export_id,
                    attempt,
                    "No export yet, sleeping for {}s",
                    self.config.polling.interval.as_secs_f64()
                );
                self.emit(Event::ExportPending {
                    export_id: export_id.to_string(),
                    attempt,
                });
            },
        )
        .await
        .map_err(|e| match e {
            Error::PollExhausted { attempts, .. } => Error::PollExhausted {
                export_id: export_id.to_string(),
                attempts,
            },
            other => other,
        })
    }

    /// Download the encrypted archive of a ready export
    ///
    /// Returns the parameters needed to decrypt it.
    pub async fn download_archive(
        &self,
        export_id: &str,
        status: &ExportStatus,
    ) -> Result<DecryptionParams> {
        let url = status.ready_url().ok_or_else(|| {
            Error::InvalidResponse(format!("export {} has no download URL", export_id))
        })?;
        let encrypted_aes_key =
            required_field(export_id, "encrypted_aes_key", &status.encrypted_aes_key)?;
        let aes_iv = required_field(export_id, "aes_iv", &status.aes_iv)?;

        let archive_path = self.config.paths.archive_path();
        let bytes = download_to_file(self.client.http(), url, &archive_path).await?;
        tracing::info!(
            export_id = %export_id,
            path = %archive_path.display(),
            bytes,
            "encrypted archive downloaded"
        );
        self.emit(Event::ArchiveDownloaded {
            export_id: export_id.to_string(),
            path: archive_path.clone(),
            bytes,
        });

        Ok(DecryptionParams {
            export_id: export_id.to_string(),
            archive_path,
            encrypted_aes_key,
            aes_iv,
        })
    }

    /// Hand the decryption parameters to the operator and wait for confirmation
    ///
    /// # Errors
    /// Returns [`Error::Aborted`] if the operator declines to continue
    pub async fn hand_off(
        &self,
        handoff: &dyn DecryptionHandoff,
        params: &DecryptionParams,
    ) -> Result<()> {
        tracing::info!(
            export_id = %params.export_id,
            "archive requires manual decryption"
        );
        self.emit(Event::DecryptionRequired {
            export_id: params.export_id.clone(),
            encrypted_aes_key: params.encrypted_aes_key.clone(),
            aes_iv: params.aes_iv.clone(),
        });

        if handoff.confirm_decrypted(params).await? {
            Ok(())
        } else {
            Err(Error::Aborted)
        }
    }
}

fn required_field(export_id: &str, name: &str, value: &Option<String>) -> Result<String> {
    value.clone().ok_or_else(|| {
        Error::InvalidResponse(format!(
            "ready export {} is missing {}",
            export_id, name
        ))
    })
}
