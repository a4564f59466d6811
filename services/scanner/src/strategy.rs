//! Runtime selection of a scanner strategy

use async_trait::async_trait;
use common::ScanMode;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::adapter::{OnScan, ScanAdapter, ScanStatus, ScanTarget};
use crate::camera::CameraScanner;
use crate::error::ScanResult;
use crate::native::{BarcodePlugin, NativeScanner};
use crate::photo::PhotoScanner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerKind {
    Camera,
    Photo,
    Native,
}

impl ScannerKind {
    /// Pick the strategy for the session's scan mode
    ///
    /// The native scanner wins whenever it is preferred and available.
    pub fn select(mode: ScanMode, prefer_native: bool, native_available: bool) -> Self {
        if prefer_native && native_available {
            return ScannerKind::Native;
        }
        match mode {
            ScanMode::Video => ScannerKind::Camera,
            ScanMode::Photo => ScannerKind::Photo,
        }
    }
}

impl fmt::Display for ScannerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScannerKind::Camera => "camera",
            ScannerKind::Photo => "photo",
            ScannerKind::Native => "native",
        };
        f.write_str(name)
    }
}

/// One of the scanner strategies behind a single [`ScanAdapter`]
pub enum Scanner {
    Camera(CameraScanner),
    Photo(PhotoScanner),
    Native(NativeScanner),
}

impl Scanner {
    pub fn camera(interval: Duration) -> Self {
        Scanner::Camera(CameraScanner::new(interval))
    }

    pub fn photo() -> Self {
        Scanner::Photo(PhotoScanner::new())
    }

    pub fn native(plugin: Arc<dyn BarcodePlugin>) -> Self {
        Scanner::Native(NativeScanner::new(plugin))
    }

    pub fn kind(&self) -> ScannerKind {
        match self {
            Scanner::Camera(_) => ScannerKind::Camera,
            Scanner::Photo(_) => ScannerKind::Photo,
            Scanner::Native(_) => ScannerKind::Native,
        }
    }

    fn adapter(&self) -> &dyn ScanAdapter {
        match self {
            Scanner::Camera(scanner) => scanner,
            Scanner::Photo(scanner) => scanner,
            Scanner::Native(scanner) => scanner,
        }
    }
}

#[async_trait]
impl ScanAdapter for Scanner {
    async fn start(&self, target: ScanTarget, on_success: OnScan) -> ScanResult<()> {
        self.adapter().start(target, on_success).await
    }

    async fn stop(&self) {
        self.adapter().stop().await
    }

    fn status(&self) -> ScanStatus {
        self.adapter().status()
    }

    fn subscribe(&self) -> watch::Receiver<ScanStatus> {
        self.adapter().subscribe()
    }
}
