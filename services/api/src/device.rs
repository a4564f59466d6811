//! Device fingerprinting
//!
//! [`describe_device`] renders a human-readable description of the calling
//! device. The string is advisory metadata attached to mutating requests; it
//! never fails and never waits longer than [`HINTS_TIMEOUT`].

use async_trait::async_trait;
use std::time::Duration;
use sysinfo::System;
use thiserror::Error;
use tracing::{debug, error};

/// Upper bound for the high-entropy hint query
pub const HINTS_TIMEOUT: Duration = Duration::from_secs(2);

/// Marker prefix of the low-entropy description
pub const USER_AGENT_PREFIX: &str = "User-Agent:";

const UNKNOWN: &str = "Unknown";

/// Error raised while querying device hints
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Failed to query device hints: {0}")]
    Query(String),
}

/// Detailed device hints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighEntropyHints {
    pub platform: Option<String>,
    pub platform_version: Option<String>,
    pub model: Option<String>,
    pub architecture: Option<String>,
    pub bitness: Option<String>,
    pub full_version: Option<String>,
}

impl HighEntropyHints {
    /// `Platform: .. | Version: .. | Model: .. | Architecture: .. | Bitness: .. | FullVersion: ..`
    pub fn describe(&self) -> String {
        [
            ("Platform", &self.platform),
            ("Version", &self.platform_version),
            ("Model", &self.model),
            ("Architecture", &self.architecture),
            ("Bitness", &self.bitness),
            ("FullVersion", &self.full_version),
        ]
        .into_iter()
        .map(|(label, value)| format!("{}: {}", label, or_unknown(value)))
        .collect::<Vec<_>>()
        .join(" | ")
    }
}

fn or_unknown(value: &Option<String>) -> &str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(UNKNOWN)
}

/// Platform capability providing device information
#[async_trait]
pub trait DeviceInfoSource: Send + Sync {
    /// Whether [`DeviceInfoSource::high_entropy_values`] can be called at all
    fn supports_high_entropy(&self) -> bool;

    /// Detailed hints; may be slow or fail
    async fn high_entropy_values(&self) -> Result<HighEntropyHints, DeviceError>;

    /// Low-entropy identifier
    fn user_agent(&self) -> Option<String>;
}

/// Describe the device, falling back to the user agent and then to a generic marker
pub async fn describe_device(source: &dyn DeviceInfoSource) -> String {
    if source.supports_high_entropy() {
        match tokio::time::timeout(HINTS_TIMEOUT, source.high_entropy_values()).await {
            Ok(Ok(hints)) => return hints.describe(),
            Ok(Err(e)) => error!("Failed to get device info: {}", e),
            Err(_) => error!(
                "Failed to get device info: timed out after {:?}",
                HINTS_TIMEOUT
            ),
        }
    } else {
        debug!("High-entropy device hints unsupported, using user agent");
    }

    let user_agent = source
        .user_agent()
        .filter(|ua| !ua.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string());
    format!("{} {}", USER_AGENT_PREFIX, user_agent)
}

/// Device information of the host running the client
#[derive(Debug, Clone)]
pub struct SystemDeviceInfo {
    client_name: String,
    client_version: String,
}

impl SystemDeviceInfo {
    /// Create a source identifying the client as `client_name/client_version`
    pub fn new(client_name: impl Into<String>, client_version: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            client_version: client_version.into(),
        }
    }
}

impl Default for SystemDeviceInfo {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }
}

#[async_trait]
impl DeviceInfoSource for SystemDeviceInfo {
    fn supports_high_entropy(&self) -> bool {
        true
    }

    async fn high_entropy_values(&self) -> Result<HighEntropyHints, DeviceError> {
        let full_version = format!("{}/{}", self.client_name, self.client_version);

        tokio::task::spawn_blocking(move || HighEntropyHints {
            platform: System::name(),
            platform_version: System::os_version(),
            model: None,
            architecture: Some(std::env::consts::ARCH.to_string()),
            bitness: Some(usize::BITS.to_string()),
            full_version: Some(full_version),
        })
        .await
        .map_err(|e| DeviceError::Query(e.to_string()))
    }

    fn user_agent(&self) -> Option<String> {
        Some(format!(
            "{}/{} ({}; {})",
            self.client_name,
            self.client_version,
            std::env::consts::OS,
            std::env::consts::ARCH
        ))
    }
}
