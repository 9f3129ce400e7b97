//! # layer-export
//!
//! Exports a Layer application's conversation data to local disk.
//!
//! An export run goes through these stages, one after another:
//! - register an RSA public key with the platform (generated on first use)
//! - reuse an export created today, or request a new one
//! - poll until the export is ready and download its encrypted archive
//! - hand the decryption parameters to the operator, who decrypts the archive
//! - download every attachment the decrypted manifest references and rewrite the
//!   manifest to point at the local copies
//!
//! ## Quick Start
//!
//! ```no_run
//! use layer_export::{BearerToken, Config, ConsoleHandoff, LayerExporter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let exporter = LayerExporter::new(
//!         Config::default(),
//!         "layer:///apps/staging/1f5c2a4e",
//!         BearerToken::new("secret"),
//!     )?;
//!
//!     // Subscribe to events
//!     let mut events = exporter.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = exporter.run(&ConsoleHandoff).await?;
//!     println!("{} attachments downloaded", summary.attachments);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Authenticated HTTP client for the platform API
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Export pipeline (decomposed into focused submodules)
pub mod exporter;
/// Manual decryption handoff
pub mod handoff;
/// RSA key pair persistence
pub mod keys;
/// Fixed-interval polling
pub mod poll;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, PlatformError, Result};
pub use exporter::LayerExporter;
pub use handoff::{ConsoleHandoff, DecryptionHandoff};
pub use types::{AppId, BearerToken, DecryptionParams, Event, ExportSummary};

/// Run the export, stopping early on a termination signal.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Files written before the signal arrived are left in place.
///
/// # Errors
/// Returns [`Error::Interrupted`] if a signal arrives before the run finishes
pub async fn run_until_interrupted(
    exporter: &LayerExporter,
    handoff: &dyn DecryptionHandoff,
) -> Result<ExportSummary> {
    tokio::select! {
        result = exporter.run(handoff) => result,
        _ = wait_for_signal() => Err(Error::Interrupted),
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = ctrl_c() => {}
            }
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Could not register SIGTERM handler, waiting for Ctrl+C only"
            );
            ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received SIGINT signal (Ctrl+C)"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            // Never resolve, so a broken listener cannot interrupt the run
            std::future::pending::<()>().await
        }
    }
}
