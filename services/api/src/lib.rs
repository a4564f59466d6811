//! Client for the QR sign-in backend
//!
//! This crate turns application intents (manage users, submit a scan, read
//! history) into HTTP calls against the endpoint held in the shared session,
//! and annotates every mutating call with a device fingerprint.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use api::{ApiClient, HistoryQuery, SystemDeviceInfo};
//! use common::Session;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::default();
//!     session.set_api_endpoint("https://signin.example.com/");
//!
//!     let client = ApiClient::new(session, Arc::new(SystemDeviceInfo::default()));
//!     for user in client.get_user_list().await? {
//!         println!("{} ({})", user.user.name, user.user.id);
//!     }
//!
//!     let history = client
//!         .get_scan_history(&HistoryQuery::new().count(10).index(0))
//!         .await?;
//!     println!("{} scans", history.len());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod device;
pub mod error;
pub mod models;

pub use client::ApiClient;
pub use device::{DeviceInfoSource, SystemDeviceInfo, describe_device};
pub use error::{ApiError, ApiResult};
pub use models::{
    HistoryQuery, ScanHistory, SigninHistory, SigninResponse, User, UserAddResponse,
    UserWithCookie,
};
