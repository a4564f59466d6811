//! Common contract of the scanner strategies
//!
//! Every strategy exposes the same observable state (`is_active`,
//! `last_error`, `last_result`) through a [`tokio::sync::watch`] channel, so a
//! front end can render the scanner without polling it.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};

use crate::camera::FrameSource;
use crate::error::{ScanError, ScanResult};

/// Callback receiving each decoded payload
pub type OnScan = Box<dyn FnMut(String) + Send + 'static>;

/// Observable scanner state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStatus {
    pub is_active: bool,
    pub last_error: Option<String>,
    pub last_result: Option<String>,
}

/// What a scanner reads from
pub enum ScanTarget {
    /// Live frame stream, scanned by [`crate::CameraScanner`]
    Frames(Box<dyn FrameSource>),
    /// Image file, scanned by [`crate::PhotoScanner`]
    Image(PathBuf),
    /// Encoded image in memory, scanned by [`crate::PhotoScanner`]
    ImageBytes(Vec<u8>),
    /// Device camera driven by [`crate::NativeScanner`]
    Device,
}

impl ScanTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            ScanTarget::Frames(_) => "frame stream",
            ScanTarget::Image(_) => "image file",
            ScanTarget::ImageBytes(_) => "image buffer",
            ScanTarget::Device => "device camera",
        }
    }
}

impl std::fmt::Debug for ScanTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanTarget::Image(path) => f.debug_tuple("Image").field(path).finish(),
            ScanTarget::ImageBytes(bytes) => write!(f, "ImageBytes({} bytes)", bytes.len()),
            other => f.write_str(other.kind()),
        }
    }
}

/// Scanner strategy contract
#[async_trait]
pub trait ScanAdapter: Send + Sync {
    /// Start scanning `target`; `on_success` receives every decoded payload
    async fn start(&self, target: ScanTarget, on_success: OnScan) -> ScanResult<()>;

    /// Stop scanning and release the underlying device; a no-op when idle
    async fn stop(&self);

    /// Current state snapshot
    fn status(&self) -> ScanStatus;

    /// Receiver notified on every state change
    fn subscribe(&self) -> watch::Receiver<ScanStatus>;
}

/// Scan `target` until the first payload is decoded, then stop
///
/// Fails with the scanner's last error (or [`ScanError::NotFound`]) when the
/// target is exhausted without a result.
pub async fn scan_once<A>(adapter: &A, target: ScanTarget) -> ScanResult<String>
where
    A: ScanAdapter + ?Sized,
{
    let (tx, rx) = oneshot::channel();
    let mut tx = Some(tx);
    adapter
        .start(
            target,
            Box::new(move |content| {
                if let Some(tx) = tx.take() {
                    let _ = tx.send(content);
                }
            }),
        )
        .await?;

    let outcome = rx.await;
    adapter.stop().await;

    match outcome {
        Ok(content) => Ok(content),
        Err(_) => match adapter.status().last_error {
            Some(message) => Err(ScanError::Source(message)),
            None => Err(ScanError::NotFound),
        },
    }
}

/// Shared write side of a scanner's [`ScanStatus`]
#[derive(Debug, Clone)]
pub(crate) struct StatusCell {
    tx: Arc<watch::Sender<ScanStatus>>,
}

impl Default for StatusCell {
    fn default() -> Self {
        let (tx, _) = watch::channel(ScanStatus::default());
        Self { tx: Arc::new(tx) }
    }
}

impl StatusCell {
    pub(crate) fn snapshot(&self) -> ScanStatus {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ScanStatus> {
        self.tx.subscribe()
    }

    /// Clear the previous run's error and result
    pub(crate) fn reset(&self) {
        self.tx.send_modify(|status| {
            status.last_error = None;
            status.last_result = None;
        });
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.tx.send_if_modified(|status| {
            let changed = status.is_active != active;
            status.is_active = active;
            changed
        });
    }

    pub(crate) fn record_result(&self, content: &str) {
        self.tx
            .send_modify(|status| status.last_result = Some(content.to_string()));
    }

    pub(crate) fn record_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_modify(|status| status.last_error = Some(message));
    }
}
