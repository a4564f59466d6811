//! Client session state
//!
//! [`Session`] holds the active user, the configured backend endpoint, the
//! display name and the preferred scan mode. It is a cheap cloneable handle:
//! every clone observes the same state, so the API client and the front end
//! see each mutation immediately.
//!
//! Persistence is explicit. [`SessionStore::load`] reads the record once at
//! startup and [`SessionStore::save`] writes the whole record back under the
//! [`SESSION_KEY`] storage key.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::error::StorageResult;
use crate::storage::LocalStorage;

/// Storage key holding the persisted session record
pub const SESSION_KEY: &str = "user";

/// Preferred way of obtaining a QR code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Live camera stream
    #[default]
    Video,
    /// Single uploaded photo
    Photo,
}

impl ScanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanMode::Video => "video",
            ScanMode::Photo => "photo",
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" | "camera" => Ok(ScanMode::Video),
            "photo" | "image" => Ok(ScanMode::Photo),
            other => Err(format!("unknown scan mode `{}` (expected video or photo)", other)),
        }
    }
}

/// Persisted session record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionState {
    pub user_id: String,
    pub api_endpoint: String,
    pub user_name: String,
    pub scan_mode: ScanMode,
}

/// Shared handle over the session state
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: Arc<RwLock<SessionState>>,
}

impl Session {
    /// Create a session from an existing state
    pub fn new(state: SessionState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Copy of the whole state
    pub fn snapshot(&self) -> SessionState {
        self.state.read().clone()
    }

    pub fn user_id(&self) -> String {
        self.state.read().user_id.clone()
    }

    pub fn set_user_id(&self, id: impl Into<String>) {
        self.state.write().user_id = id.into();
    }

    /// Endpoint exactly as it was set
    pub fn api_endpoint(&self) -> String {
        self.state.read().api_endpoint.clone()
    }

    /// Stored verbatim; normalization happens in [`Session::base_url`]
    pub fn set_api_endpoint(&self, url: impl Into<String>) {
        self.state.write().api_endpoint = url.into();
    }

    pub fn user_name(&self) -> String {
        self.state.read().user_name.clone()
    }

    pub fn set_user_name(&self, name: impl Into<String>) {
        self.state.write().user_name = name.into();
    }

    pub fn scan_mode(&self) -> ScanMode {
        self.state.read().scan_mode
    }

    pub fn set_scan_mode(&self, mode: ScanMode) {
        self.state.write().scan_mode = mode;
    }

    /// Forget the selected user (id and display name)
    pub fn clear_user(&self) {
        let mut state = self.state.write();
        state.user_id.clear();
        state.user_name.clear();
    }

    pub fn clear_api_endpoint(&self) {
        self.state.write().api_endpoint.clear();
    }

    /// Clear user identity and endpoint. The scan mode preference survives.
    pub fn clear_all(&self) {
        let mut state = self.state.write();
        state.user_id.clear();
        state.user_name.clear();
        state.api_endpoint.clear();
    }

    /// Endpoint used to build request URLs, with one trailing slash removed
    pub fn base_url(&self) -> String {
        let state = self.state.read();
        let endpoint = state.api_endpoint.as_str();
        endpoint.strip_suffix('/').unwrap_or(endpoint).to_string()
    }
}

/// Loads and saves the session record in local storage
#[derive(Debug, Clone)]
pub struct SessionStore {
    storage: LocalStorage,
}

impl SessionStore {
    /// Create a new session store
    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }

    /// Read the persisted session, or a default one on first use
    pub async fn load(&self) -> StorageResult<Session> {
        let state: Option<SessionState> = self.storage.get(SESSION_KEY).await?;
        let state = state.unwrap_or_default();
        info!(
            "Loaded session (user: {}, endpoint: {})",
            display_or_unset(&state.user_id),
            display_or_unset(&state.api_endpoint)
        );
        Ok(Session::new(state))
    }

    /// Write the whole session record
    pub async fn save(&self, session: &Session) -> StorageResult<()> {
        self.storage.set(SESSION_KEY, &session.snapshot()).await
    }
}

fn display_or_unset(value: &str) -> &str {
    if value.is_empty() { "<unset>" } else { value }
}
