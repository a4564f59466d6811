//! Single-image scanning

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::adapter::{OnScan, ScanAdapter, ScanStatus, ScanTarget, StatusCell};
use crate::decoder;
use crate::error::{ScanError, ScanResult};

/// Shown when the image decodes but holds no readable code
pub const NO_QR_CODE_MESSAGE: &str =
    "No QR code was recognized. Make sure the photo is sharp and contains the whole QR code.";

/// Shown for any other failure
pub const SCAN_FAILED_MESSAGE: &str = "Could not scan a QR code from the image. Please try again.";

/// Decodes one image per `start` call
#[derive(Default)]
pub struct PhotoScanner {
    status: StatusCell,
}

impl PhotoScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan an image file
    pub async fn scan_file(&self, path: impl AsRef<Path>, on_success: OnScan) -> ScanResult<()> {
        self.start(ScanTarget::Image(path.as_ref().to_path_buf()), on_success)
            .await
    }
}

fn user_message(error: &ScanError) -> &'static str {
    match error {
        ScanError::NotFound => NO_QR_CODE_MESSAGE,
        _ => SCAN_FAILED_MESSAGE,
    }
}

#[async_trait]
impl ScanAdapter for PhotoScanner {
    async fn start(&self, target: ScanTarget, mut on_success: OnScan) -> ScanResult<()> {
        let decode = match target {
            ScanTarget::Image(path) => {
                info!("Scanning QR code from {}", path.display());
                tokio::task::spawn_blocking(move || decoder::decode_file(&path))
            }
            ScanTarget::ImageBytes(bytes) => {
                tokio::task::spawn_blocking(move || decoder::decode_bytes(&bytes))
            }
            other => {
                return Err(ScanError::UnsupportedTarget {
                    adapter: "photo",
                    target: other.kind(),
                });
            }
        };

        self.status.reset();
        self.status.set_active(true);
        let outcome = decode
            .await
            .unwrap_or_else(|e| Err(ScanError::Source(e.to_string())));
        self.status.set_active(false);

        match outcome {
            Ok(content) => {
                self.status.record_result(&content);
                on_success(content);
                Ok(())
            }
            Err(e) => {
                warn!("QR photo scan failed: {}", e);
                let message = user_message(&e);
                self.status.record_error(message);
                Err(ScanError::Decode(message.to_string()))
            }
        }
    }

    /// Nothing runs between calls
    async fn stop(&self) {
        self.status.set_active(false);
    }

    fn status(&self) -> ScanStatus {
        self.status.snapshot()
    }

    fn subscribe(&self) -> watch::Receiver<ScanStatus> {
        self.status.subscribe()
    }
}
