//! QR scanning strategies
//!
//! Three interchangeable scanners share the [`ScanAdapter`] contract:
//! - [`CameraScanner`] decodes a live [`FrameSource`] continuously
//! - [`PhotoScanner`] decodes a single image
//! - [`NativeScanner`] drives a platform [`BarcodePlugin`] behind a camera
//!   permission flow
//!
//! ```rust,no_run
//! use scanner::{FrameSequence, ScanAdapter, ScanTarget, Scanner, scan_once};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scanner = Scanner::camera(Duration::from_millis(40));
//!     let frames = FrameSequence::from_dir("./frames")?;
//!
//!     let payload = scan_once(&scanner, ScanTarget::Frames(Box::new(frames))).await?;
//!     println!("decoded: {}", payload);
//!     assert!(!scanner.status().is_active);
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod camera;
pub mod decoder;
pub mod error;
pub mod native;
pub mod photo;
pub mod strategy;

pub use adapter::{OnScan, ScanAdapter, ScanStatus, ScanTarget, scan_once};
pub use camera::{CameraScanner, DEFAULT_SCAN_INTERVAL, FrameSequence, FrameSource, StaticFrames};
pub use error::{ScanError, ScanResult};
pub use native::{
    BarcodeFormat, BarcodePlugin, NativeScanner, PermissionState, ScanOptions, SettingsPrompt,
    ZbarPlugin, native_available,
};
pub use photo::PhotoScanner;
pub use strategy::{Scanner, ScannerKind};
