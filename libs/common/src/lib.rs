//! Common library for the QR sign-in client
//!
//! This crate provides the pieces shared by the API client, the scanners and
//! the command-line front end: the persisted session state, the local storage
//! it lives in, configuration loading, error types and display helpers.

pub mod config;
pub mod error;
pub mod format;
pub mod session;
pub mod storage;

pub use config::ClientConfig;
pub use session::{ScanMode, Session, SessionState, SessionStore};
pub use storage::LocalStorage;

/// Example usage of the session store
///
/// ```rust,no_run
/// use common::{LocalStorage, SessionStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let storage = LocalStorage::open("/tmp/qr-signin/storage.json").await?;
///     let store = SessionStore::new(storage);
///
///     let session = store.load().await?;
///     session.set_api_endpoint("https://signin.example.com/");
///     store.save(&session).await?;
///     Ok(())
/// }
/// ```
pub fn example_usage() {}
