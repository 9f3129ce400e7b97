//! Export job selection and creation.

use crate::error::{Error, Result};
use crate::types::{Event, ExportJob, ExportRequest};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::LayerExporter;

/// Calendar date of an export's `created_at` timestamp
///
/// RFC 3339 timestamps keep the date in their own offset; no conversion to local time
/// or UTC is made. Naive date-times and plain dates are accepted too.
pub fn parse_created_date(created_at: &str) -> Option<NaiveDate> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(created_at) {
        return Some(ts.date_naive());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(created_at, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts.date());
    }
    NaiveDate::parse_from_str(created_at, "%Y-%m-%d").ok()
}

/// Pick the export to reuse, if any
///
/// The platform lists exports newest first. If the newest export was created on
/// `today`, the id of the *last* listed export is returned. Returns `None` for an
/// empty list or when the newest export is older.
///
/// # Errors
/// Returns [`Error::InvalidResponse`] if the newest export's date cannot be parsed, or
/// if the export to reuse has no id
pub fn select_reusable_export(exports: &[ExportJob], today: NaiveDate) -> Result<Option<String>> {
    let Some(newest) = exports.first() else {
        return Ok(None);
    };

    let created = parse_created_date(&newest.created_at).ok_or_else(|| {
        Error::InvalidResponse(format!(
            "export {} has unparseable created_at {:?}",
            newest.id, newest.created_at
        ))
    })?;

    if created != today {
        return Ok(None);
    }

    // Reuse picks the last element even though the date check used the first.
    match exports.last() {
        Some(job) if job.id.is_empty() => Err(Error::InvalidResponse(
            "last listed export has no id".to_string(),
        )),
        other => Ok(other.map(|job| job.id.clone())),
    }
}

#[derive(serde::Deserialize)]
struct CreatedExport {
    id: String,
}

impl LayerExporter {
    /// Reuse today's export or ask the platform for a new one
    ///
    /// "Today" is the local calendar date of the machine running the export.
    pub async fn request_export(&self) -> Result<ExportRequest> {
        tracing::info!("Requesting export");

        let exports: Vec<ExportJob> = self.client.get("exports").await?.json()?;
        let today = chrono::Local::now().date_naive();

        let request = match select_reusable_export(&exports, today)? {
            Some(export_id) => {
                tracing::info!(export_id = %export_id, "reusing export created today");
                ExportRequest {
                    export_id,
                    reused: true,
                }
            }
            None => {
                let created: CreatedExport = self.client.post("exports", None).await?.json()?;
                tracing::info!(export_id = %created.id, "created new export");
                ExportRequest {
                    export_id: created.id,
                    reused: false,
                }
            }
        };

        self.emit(Event::ExportRequested {
            export_id: request.export_id.clone(),
            reused: request.reused,
        });

        Ok(request)
    }
}
