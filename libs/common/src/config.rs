//! Client configuration
//!
//! Settings are layered, lowest priority first: built-in defaults, an optional
//! TOML file, then `SIGNIN_`-prefixed environment variables.
//!
//! # Environment Variables
//! - `SIGNIN_STORAGE_PATH`: local storage file (default: `<data dir>/qr-signin/storage.json`)
//! - `SIGNIN_LOG_LEVEL`: fallback log filter when `RUST_LOG` is unset (default: `info`)
//! - `SIGNIN_DEFAULT_ENDPOINT`: endpoint used when the session has none
//! - `SIGNIN_PREFER_NATIVE`: use the native scanner when it is available (default: `false`)
//! - `SIGNIN_SCAN_INTERVAL_MS`: pause between camera frames (default: `40`)
//! - `SIGNIN_REQUEST_TIMEOUT_SECS`: optional HTTP timeout (default: none)
//! - `SIGNIN_VIDEO_DEVICE`: device used by the native scanner (default: `/dev/video0`)

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Base name of the optional configuration file in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "signin";

/// Prefix of the environment variables read by [`ClientConfig::load`]
pub const ENV_PREFIX: &str = "SIGNIN";

/// Client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Local storage file holding the session record
    pub storage_path: PathBuf,
    /// Log filter used when `RUST_LOG` is not set
    pub log_level: String,
    /// Endpoint seeded into an empty session
    pub default_endpoint: Option<String>,
    /// Prefer the native scanner over camera/photo when available
    pub prefer_native: bool,
    /// Pause between two camera frames, in milliseconds
    pub scan_interval_ms: u64,
    /// HTTP timeout in seconds; requests never time out when unset
    pub request_timeout_secs: Option<u64>,
    /// Video device handed to the native scanner
    pub video_device: String,
}

impl ClientConfig {
    /// Load the configuration
    ///
    /// When `file` is given it must exist; otherwise `signin.toml` in the
    /// working directory is read if present.
    pub fn load(file: Option<&Path>) -> ConfigResult<Self> {
        let builder = Config::builder()
            .set_default(
                "storage_path",
                default_storage_path().to_string_lossy().to_string(),
            )?
            .set_default("log_level", "info")?
            .set_default("prefer_native", false)?
            .set_default("scan_interval_ms", 40_i64)?
            .set_default("video_device", "/dev/video0")?;

        let builder = match file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: ClientConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.scan_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "scan_interval_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if self.storage_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                key: "storage_path".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Platform data directory location of the storage file
pub fn default_storage_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("qr-signin")
        .join("storage.json")
}
