//! Export encryption key pair management
//!
//! The platform encrypts each export archive's AES key with a public key registered by
//! the exporter. The key pair lives in two PEM files in the working directory and is
//! reused across runs: a new pair is generated only when either file is missing.

use crate::error::{Error, Result};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::path::{Path, PathBuf};

/// PEM-encoded RSA key pair
#[derive(Clone)]
pub struct KeyPair {
    /// SubjectPublicKeyInfo PEM ("BEGIN PUBLIC KEY"), sent to the platform
    pub public_pem: String,
    /// PKCS#1 PEM ("BEGIN RSA PRIVATE KEY"), kept on disk for manual decryption
    pub private_pem: String,
    /// Whether the pair was generated by this call (false = loaded from disk)
    pub generated: bool,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_pem", &self.public_pem)
            .field("private_pem", &"<redacted>")
            .field("generated", &self.generated)
            .finish()
    }
}

/// Loads or generates the export key pair
#[derive(Clone, Debug)]
pub struct KeyManager {
    public_path: PathBuf,
    private_path: PathBuf,
    bits: usize,
}

impl KeyManager {
    /// Create a key manager for the given PEM file locations
    pub fn new(
        public_path: impl Into<PathBuf>,
        private_path: impl Into<PathBuf>,
        bits: usize,
    ) -> Self {
        Self {
            public_path: public_path.into(),
            private_path: private_path.into(),
            bits,
        }
    }

    /// Public key file
    pub fn public_path(&self) -> &Path {
        &self.public_path
    }

    /// Private key file
    pub fn private_path(&self) -> &Path {
        &self.private_path
    }

    /// Reuse the key pair on disk if both files exist, otherwise generate and persist one
    ///
    /// When only one of the two files exists, both are overwritten with a fresh pair.
    pub async fn load_or_generate(&self) -> Result<KeyPair> {
        if is_file(&self.public_path).await && is_file(&self.private_path).await {
            let public_pem = tokio::fs::read_to_string(&self.public_path).await?;
            let private_pem = tokio::fs::read_to_string(&self.private_path).await?;
            tracing::debug!(path = %self.public_path.display(), "reusing existing key pair");
            return Ok(KeyPair {
                public_pem,
                private_pem,
                generated: false,
            });
        }

        tracing::info!(bits = self.bits, "generating export key pair");
        let bits = self.bits;
        let pair = tokio::task::spawn_blocking(move || generate_pem_pair(bits))
            .await
            .map_err(|e| Error::Key(format!("key generation task failed: {}", e)))??;

        tokio::fs::write(&self.public_path, &pair.public_pem).await?;
        tokio::fs::write(&self.private_path, &pair.private_pem).await?;
        tracing::debug!(
            public = %self.public_path.display(),
            private = %self.private_path.display(),
            "key pair written"
        );

        Ok(pair)
    }
}

// Anything but a regular file counts as missing
async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|metadata| metadata.is_file())
}

fn generate_pem_pair(bits: usize) -> Result<KeyPair> {
    let mut rng = rand::rngs::OsRng;
    let private = RsaPrivateKey::new(&mut rng, bits)
        .map_err(|e| Error::Key(format!("failed to generate {}-bit RSA key: {}", bits, e)))?;
    let public = RsaPublicKey::from(&private);

    let public_pem = public
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| Error::Key(format!("failed to encode public key: {}", e)))?;
    let private_pem = private
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| Error::Key(format!("failed to encode private key: {}", e)))?;

    Ok(KeyPair {
        public_pem,
        private_pem: private_pem.to_string(),
        generated: true,
    })
}
