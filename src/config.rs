//! Configuration types for layer-export

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Platform API settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Scheme and host of the platform API (default: "https://api.layer.com")
    ///
    /// Request URIs are built as `{base_url}/apps/{app_id}/{suffix}`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// TCP connect timeout for every request (default: 30 seconds)
    ///
    /// No overall request timeout is applied: archives can be large.
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Local file layout
///
/// Archive, manifest and attachment locations are fixed names under `export_dir`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Export working directory (default: "./export")
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,

    /// Public key PEM file (default: "./key.public")
    #[serde(default = "default_public_key_path")]
    pub public_key_path: PathBuf,

    /// Private key PEM file (default: "./key.private")
    #[serde(default = "default_private_key_path")]
    pub private_key_path: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            export_dir: default_export_dir(),
            public_key_path: default_public_key_path(),
            private_key_path: default_private_key_path(),
        }
    }
}

impl PathsConfig {
    /// Directory attachments are downloaded into
    pub fn downloads_dir(&self) -> PathBuf {
        self.export_dir.join("downloads")
    }

    /// Location of the encrypted export archive
    pub fn archive_path(&self) -> PathBuf {
        self.export_dir.join("export.enc.tar.gz")
    }

    /// Location of the decrypted manifest, read and rewritten in place
    pub fn manifest_path(&self) -> PathBuf {
        self.export_dir.join("export.json")
    }
}

/// Export status polling
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Wait between status checks (default: 60 seconds)
    #[serde(default = "default_poll_interval", with = "duration_ms_serde")]
    pub interval: Duration,

    /// Maximum number of status checks before giving up (None = poll forever)
    ///
    /// The default is unbounded: the platform gives no completion deadline for exports.
    #[serde(default)]
    pub max_polls: Option<u32>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            max_polls: None,
        }
    }
}

/// Export encryption key settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyConfig {
    /// RSA modulus size for freshly generated key pairs (default: 2048)
    #[serde(default = "default_key_bits")]
    pub bits: usize,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            bits: default_key_bits(),
        }
    }
}

/// Main configuration for [`LayerExporter`](crate::LayerExporter)
///
/// Every field has a default, so an empty JSON object is a valid configuration file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Platform API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Local file layout
    #[serde(default)]
    pub paths: PathsConfig,

    /// Export status polling
    #[serde(default)]
    pub polling: PollingConfig,

    /// Key pair generation
    #[serde(default)]
    pub keys: KeyConfig,
}

impl Config {
    /// Load a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read config file '{}': {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse config file '{}': {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that serde defaults cannot rule out
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.api.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL '{}': {}", self.api.base_url, e),
            key: Some("api.base_url".to_string()),
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::Config {
                message: format!("base URL must be http or https, got '{}'", base.scheme()),
                key: Some("api.base_url".to_string()),
            });
        }

        if self.polling.interval.is_zero() {
            return Err(Error::Config {
                message: "poll interval must be greater than zero".to_string(),
                key: Some("polling.interval".to_string()),
            });
        }

        if self.polling.max_polls == Some(0) {
            return Err(Error::Config {
                message: "max_polls must be at least 1 (omit it to poll forever)".to_string(),
                key: Some("polling.max_polls".to_string()),
            });
        }

        if self.keys.bits < MIN_KEY_BITS {
            return Err(Error::Config {
                message: format!(
                    "RSA key size {} is below the minimum of {}",
                    self.keys.bits, MIN_KEY_BITS
                ),
                key: Some("keys.bits".to_string()),
            });
        }

        Ok(())
    }
}

const MIN_KEY_BITS: usize = 1024;

fn default_base_url() -> String {
    "https://api.layer.com".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("layer-export/{}", env!("CARGO_PKG_VERSION"))
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("export")
}

fn default_public_key_path() -> PathBuf {
    PathBuf::from("key.public")
}

fn default_private_key_path() -> PathBuf {
    PathBuf::from("key.private")
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_key_bits() -> usize {
    2048
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Poll intervals go down to milliseconds
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
