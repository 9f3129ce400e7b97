//! Error types for layer-export
//!
//! This module provides the error handling for the exporter, including:
//! - [`PlatformError`], the structured error surfaced for any non-success response
//!   from the Layer platform or a signed download URL
//! - Ambient failures (network transport, file system, JSON)
//! - Pipeline-level failures (invalid responses, malformed manifests, operator abort)
//!
//! Nothing in the pipeline recovers from an error locally: every variant propagates
//! to the caller and ends the run.

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for layer-export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for layer-export
#[derive(Debug, Error)]
pub enum Error {
    /// The platform (or a signed download URL) answered with a non-success status
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api.base_url")
        key: Option<String>,
    },

    /// Network error (connection refused, TLS failure, body read failure, ...)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A successful response did not carry the fields the pipeline needs
    #[error("invalid response from platform: {0}")]
    InvalidResponse(String),

    /// The decrypted manifest does not have the expected items/messages/parts shape
    #[error("invalid manifest {path}: {reason}")]
    InvalidManifest {
        /// Manifest file that failed to parse
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// Key pair generation or PEM encoding failed
    #[error("key error: {0}")]
    Key(String),

    /// The export never became ready within the configured number of polls
    #[error("export {export_id} not ready after {attempts} status checks")]
    PollExhausted {
        /// Export job being polled
        export_id: String,
        /// Number of status requests issued
        attempts: u32,
    },

    /// The operator declined to continue after the decryption handoff
    #[error("aborted by operator")]
    Aborted,

    /// The run was stopped by SIGINT/SIGTERM
    #[error("interrupted by signal")]
    Interrupted,
}

impl Error {
    /// HTTP status code carried by a platform error, if this is one
    pub fn http_code(&self) -> Option<u16> {
        match self {
            Error::Platform(e) => Some(e.http_code),
            _ => None,
        }
    }
}

/// Structured error returned by the Layer platform
///
/// When the error body is a JSON object, `message`, `code` and `error_id` are taken from
/// its `message`, `code` and `id` fields. Otherwise `message` holds the raw response text
/// and `code`/`error_id` stay unset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("platform error (HTTP {http_code}): {}", .message.as_deref().unwrap_or("<no message>"))]
pub struct PlatformError {
    /// Human-readable message (or raw response text)
    pub message: Option<String>,
    /// HTTP status code of the failed response
    pub http_code: u16,
    /// Service-specific error code
    pub code: Option<String>,
    /// Service-specific error identifier
    pub error_id: Option<String>,
}

impl PlatformError {
    /// Build a platform error from a failed response's status and body text.
    pub fn from_body(status: StatusCode, body: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(serde_json::Value::Object(fields)) => Self {
                message: fields.get("message").and_then(field_to_string),
                http_code: status.as_u16(),
                code: fields.get("code").and_then(field_to_string),
                error_id: fields.get("id").and_then(field_to_string),
            },
            _ => Self {
                message: Some(body.to_string()),
                http_code: status.as_u16(),
                code: None,
                error_id: None,
            },
        }
    }
}

// Layer sends numeric codes ("code": 104); render them like string codes.
fn field_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Convert a non-success response into [`Error::Platform`]
///
/// Consumes the response body. If the body cannot be read at all, the transport error
/// is returned instead.
pub(crate) async fn platform_error(response: reqwest::Response) -> Error {
    let status = response.status();
    match response.text().await {
        Ok(body) => Error::Platform(PlatformError::from_body(status, &body)),
        Err(e) => Error::Network(e),
    }
}
