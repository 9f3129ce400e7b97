//! Export key registration.

use crate::error::Result;
use crate::keys::{KeyManager, KeyPair};
use crate::types::Event;

use super::LayerExporter;

impl LayerExporter {
    /// Key manager for the configured PEM file locations
    pub fn key_manager(&self) -> KeyManager {
        KeyManager::new(
            &self.config.paths.public_key_path,
            &self.config.paths.private_key_path,
            self.config.keys.bits,
        )
    }

    /// Load or generate the key pair and register its public half
    ///
    /// The platform encrypts the export's AES key with this public key.
    pub async fn register_key(&self) -> Result<KeyPair> {
        tracing::info!("Registering public key");

        let pair = self.key_manager().load_or_generate().await?;

        self.client
            .put(
                "export_security",
                &serde_json::json!({ "public_key": pair.public_pem }),
            )
            .await?;

        tracing::debug!(generated = pair.generated, "public key registered");
        self.emit(Event::KeyRegistered {
            generated: pair.generated,
        });

        Ok(pair)
    }
}
