//! Core types for layer-export

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Identifier of the Layer application being exported
///
/// Accepts either a bare id or a URI-shaped id (`layer:///apps/staging/<uuid>`,
/// `https://api.layer.com/apps/<uuid>`); only the final path segment is kept.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(String);

impl AppId {
    /// Normalize a raw app identifier to its final `/`-separated segment
    pub fn new(raw: &str) -> Self {
        let id = raw.rsplit('/').next().unwrap_or(raw);
        Self(id.to_string())
    }

    /// The normalized identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bearer token used to authenticate against the platform API
///
/// Never persisted, and redacted from `Debug` output.
#[derive(Clone)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wrap a token string
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// An export job as listed by `GET /apps/{id}/exports`
///
/// Only the first job's date and the last job's id are ever read, so missing fields
/// default to empty instead of failing the whole list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportJob {
    /// Opaque export id
    #[serde(default)]
    pub id: String,
    /// Creation timestamp as sent by the platform
    #[serde(default)]
    pub created_at: String,
}

/// Status of an export job (`GET /apps/{id}/exports/{export_id}/status`)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExportStatus {
    /// Signed URL of the encrypted archive; empty or null until the export is ready
    #[serde(default)]
    pub download_url: Option<String>,
    /// Symmetric key of the archive, encrypted with the registered public key
    #[serde(default)]
    pub encrypted_aes_key: Option<String>,
    /// Initialization vector of the archive encryption
    #[serde(default)]
    pub aes_iv: Option<String>,
}

impl ExportStatus {
    /// The download URL, if the export is ready
    pub fn ready_url(&self) -> Option<&str> {
        self.download_url.as_deref().filter(|url| !url.is_empty())
    }
}

/// Parameters the operator needs to decrypt the archive by hand
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionParams {
    /// Export the archive belongs to
    pub export_id: String,
    /// Where the encrypted archive was written
    pub archive_path: PathBuf,
    /// Encrypted AES key (decrypt with the private key)
    pub encrypted_aes_key: String,
    /// AES initialization vector
    pub aes_iv: String,
}

/// Outcome of requesting an export
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportRequest {
    /// Export id to poll
    pub export_id: String,
    /// Whether an export created today was reused instead of creating a new one
    pub reused: bool,
}

/// Summary of a completed pipeline run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportSummary {
    /// Export that was downloaded
    pub export_id: String,
    /// Whether an existing export from today was reused
    pub reused_export: bool,
    /// Whether a fresh key pair was generated for this run
    pub generated_keys: bool,
    /// Number of poll intervals waited before the export was ready
    pub polls_waited: u32,
    /// Location of the encrypted archive
    pub archive_path: PathBuf,
    /// Number of attachments downloaded and rewritten in the manifest
    pub attachments: u64,
}

/// Event emitted during an export run
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Public key registered with the platform
    KeyRegistered {
        /// Whether the key pair was generated during this run
        generated: bool,
    },

    /// Export job chosen for this run
    ExportRequested {
        /// Export id
        export_id: String,
        /// Whether today's existing export was reused
        reused: bool,
    },

    /// Export not ready yet; the poller is about to wait
    ExportPending {
        /// Export id
        export_id: String,
        /// Status check number (1-based)
        attempt: u32,
    },

    /// Encrypted archive written to disk
    ArchiveDownloaded {
        /// Export id
        export_id: String,
        /// Archive location
        path: PathBuf,
        /// Bytes written
        bytes: u64,
    },

    /// Operator must decrypt the archive out of band
    DecryptionRequired {
        /// Export id
        export_id: String,
        /// Encrypted AES key
        encrypted_aes_key: String,
        /// AES initialization vector
        aes_iv: String,
    },

    /// Attachment downloaded for a manifest part
    AttachmentDownloaded {
        /// Sequential attachment number (also the file name)
        index: u64,
        /// Attachment location
        path: PathBuf,
        /// Bytes written
        bytes: u64,
    },

    /// Manifest rewritten with local attachment references
    ManifestRewritten {
        /// Manifest location
        path: PathBuf,
        /// Number of references rewritten
        attachments: u64,
    },
}
