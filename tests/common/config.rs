//! Test configuration helpers for creating exporters against a mock platform

use async_trait::async_trait;
use layer_export::{BearerToken, Config, DecryptionHandoff, DecryptionParams, LayerExporter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::MockServer;

/// Config with every file under `root`, fast polling and small keys
pub fn test_config(server: &MockServer, root: &Path) -> Config {
    let mut config = Config::default();
    config.api.base_url = server.uri();
    config.paths.export_dir = root.join("export");
    config.paths.public_key_path = root.join("key.public");
    config.paths.private_key_path = root.join("key.private");
    config.polling.interval = Duration::from_millis(20);
    config.keys.bits = 1024;
    config
}

/// Create an exporter for `app_id` in a fresh temporary directory
///
/// The returned `TempDir` must be kept alive for the duration of the test.
pub fn create_exporter(server: &MockServer, app_id: &str) -> (LayerExporter, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = test_config(server, temp_dir.path());
    let exporter = LayerExporter::new(config, app_id, BearerToken::new("e2e-token"))
        .expect("Failed to create exporter");
    (exporter, temp_dir)
}

/// Handoff standing in for the operator: writes the "decrypted" manifest and continues
pub struct OperatorHandoff {
    manifest_path: PathBuf,
    manifest: serde_json::Value,
    /// Parameters the handoff was called with
    pub seen: Mutex<Vec<DecryptionParams>>,
}

impl OperatorHandoff {
    /// Handoff that writes `manifest` to `manifest_path` when asked
    pub fn new(manifest_path: PathBuf, manifest: serde_json::Value) -> Self {
        Self {
            manifest_path,
            manifest,
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl DecryptionHandoff for OperatorHandoff {
    async fn confirm_decrypted(&self, params: &DecryptionParams) -> layer_export::Result<bool> {
        self.seen
            .lock()
            .expect("handoff mutex poisoned")
            .push(params.clone());
        tokio::fs::write(&self.manifest_path, serde_json::to_vec(&self.manifest)?).await?;
        Ok(true)
    }
}
