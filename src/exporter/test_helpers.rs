//! Shared test helpers for creating LayerExporter instances in tests.

use crate::config::Config;
use crate::error::Result;
use crate::exporter::LayerExporter;
use crate::handoff::DecryptionHandoff;
use crate::types::{BearerToken, DecryptionParams, Event};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::{TempDir, tempdir};
use wiremock::MockServer;

/// App id every test exporter is bound to
pub(crate) const TEST_APP: &str = "abc123";
/// Bearer token every test exporter sends
pub(crate) const TEST_TOKEN: &str = "test-token";

/// Config pointing at `server`, with all files under `root` and fast polling.
pub(crate) fn test_config(server: &MockServer, root: &Path) -> Config {
    let mut config = Config::default();
    config.api.base_url = server.uri();
    config.paths.export_dir = root.join("export");
    config.paths.public_key_path = root.join("key.public");
    config.paths.private_key_path = root.join("key.private");
    config.polling.interval = Duration::from_millis(10);
    config.keys.bits = 1024;
    config
}

/// Helper to create a test LayerExporter against a mock server.
/// Returns the exporter and the tempdir (which must be kept alive).
pub(crate) async fn create_test_exporter(server: &MockServer) -> (LayerExporter, TempDir) {
    create_test_exporter_with(server, |_| {}).await
}

/// Same as [`create_test_exporter`], letting the test adjust the config first.
pub(crate) async fn create_test_exporter_with(
    server: &MockServer,
    adjust: impl FnOnce(&mut Config),
) -> (LayerExporter, TempDir) {
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(server, temp_dir.path());
    adjust(&mut config);

    let exporter = LayerExporter::new(config, TEST_APP, BearerToken::new(TEST_TOKEN)).unwrap();
    exporter.prepare_directories().await.unwrap();
    (exporter, temp_dir)
}

/// Write placeholder key files so registration skips key generation.
pub(crate) fn write_existing_keys(exporter: &LayerExporter) {
    std::fs::write(&exporter.config.paths.public_key_path, "existing-public-pem").unwrap();
    std::fs::write(&exporter.config.paths.private_key_path, "existing-private-pem").unwrap();
}

/// Write `manifest` to the exporter's manifest path.
pub(crate) fn write_manifest(exporter: &LayerExporter, manifest: &serde_json::Value) {
    std::fs::write(
        exporter.config.paths.manifest_path(),
        serde_json::to_vec(manifest).unwrap(),
    )
    .unwrap();
}

/// Read the exporter's manifest back as JSON.
pub(crate) fn read_manifest(exporter: &LayerExporter) -> serde_json::Value {
    serde_json::from_slice(&std::fs::read(exporter.config.paths.manifest_path()).unwrap()).unwrap()
}

/// Drain every event currently buffered in `rx`.
pub(crate) fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Handoff that answers without a terminal, optionally "decrypting" a manifest
/// into place the way the operator would.
pub(crate) struct ScriptedHandoff {
    answer: bool,
    manifest: Option<(std::path::PathBuf, serde_json::Value)>,
    pub(crate) seen: Mutex<Vec<DecryptionParams>>,
}

impl ScriptedHandoff {
    pub(crate) fn accepting() -> Self {
        Self {
            answer: true,
            manifest: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn declining() -> Self {
        Self {
            answer: false,
            ..Self::accepting()
        }
    }

    /// Accept and write `manifest` to `path` when asked.
    pub(crate) fn producing(path: std::path::PathBuf, manifest: serde_json::Value) -> Self {
        Self {
            manifest: Some((path, manifest)),
            ..Self::accepting()
        }
    }
}

#[async_trait]
impl DecryptionHandoff for ScriptedHandoff {
    async fn confirm_decrypted(&self, params: &DecryptionParams) -> Result<bool> {
        self.seen.lock().unwrap().push(params.clone());
        if let Some((path, manifest)) = &self.manifest {
            std::fs::write(path, serde_json::to_vec(manifest)?)?;
        }
        Ok(self.answer)
    }
}
