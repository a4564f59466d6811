//! Continuous scanning of a live frame stream
//!
//! [`CameraScanner`] pulls frames from a [`FrameSource`] on a fixed interval
//! and hands every decoded payload to the callback. The stream keeps running
//! after a successful decode; only `stop`, the end of the stream, or a source
//! failure ends it.

use async_trait::async_trait;
use image::GrayImage;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{Mutex, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::adapter::{OnScan, ScanAdapter, ScanStatus, ScanTarget, StatusCell};
use crate::decoder;
use crate::error::{ScanError, ScanResult};

/// Default pause between two decode attempts
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_millis(40);

/// Producer of greyscale frames
#[async_trait]
pub trait FrameSource: Send {
    /// Next frame, or `None` once the stream has ended
    async fn next_frame(&mut self) -> ScanResult<Option<GrayImage>>;

    /// Release the underlying device; called once when scanning ends
    async fn release(&mut self) {}
}

/// In-memory frames, replayed once or in a loop
pub struct StaticFrames {
    frames: VecDeque<GrayImage>,
    looping: bool,
}

impl StaticFrames {
    pub fn new(frames: Vec<GrayImage>) -> Self {
        Self {
            frames: frames.into(),
            looping: false,
        }
    }

    /// Replay `frames` until the scanner is stopped
    pub fn looping(frames: Vec<GrayImage>) -> Self {
        Self {
            frames: frames.into(),
            looping: true,
        }
    }
}

#[async_trait]
impl FrameSource for StaticFrames {
    async fn next_frame(&mut self) -> ScanResult<Option<GrayImage>> {
        let frame = self.frames.pop_front();
        if self.looping {
            if let Some(frame) = &frame {
                self.frames.push_back(frame.clone());
            }
        }
        Ok(frame)
    }

    async fn release(&mut self) {
        self.frames.clear();
    }
}

/// Directory of image files played back in file-name order
pub struct FrameSequence {
    files: VecDeque<PathBuf>,
}

impl FrameSequence {
    /// Collect the PNG and JPEG files of `dir`
    pub fn from_dir(dir: impl AsRef<Path>) -> ScanResult<Self> {
        let dir = dir.as_ref();
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && is_frame_file(&path) {
                files.push(path);
            }
        }

        if files.is_empty() {
            return Err(ScanError::Source(format!(
                "no image frames found in {}",
                dir.display()
            )));
        }

        files.sort();
        info!("Loaded {} frame(s) from {}", files.len(), dir.display());
        Ok(Self {
            files: files.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
        .unwrap_or(false)
}

#[async_trait]
impl FrameSource for FrameSequence {
    async fn next_frame(&mut self) -> ScanResult<Option<GrayImage>> {
        let Some(path) = self.files.pop_front() else {
            return Ok(None);
        };

        let frame = tokio::task::spawn_blocking(move || image::open(&path).map(|img| img.to_luma8()))
            .await
            .map_err(|e| ScanError::Source(e.to_string()))??;
        Ok(Some(frame))
    }

    async fn release(&mut self) {
        self.files.clear();
    }
}

struct Running {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Interval-driven scanner over a [`FrameSource`]
pub struct CameraScanner {
    status: StatusCell,
    interval: Duration,
    running: Mutex<Option<Running>>,
}

impl Default for CameraScanner {
    fn default() -> Self {
        Self::new(DEFAULT_SCAN_INTERVAL)
    }
}

impl CameraScanner {
    pub fn new(interval: Duration) -> Self {
        Self {
            status: StatusCell::default(),
            interval,
            running: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[async_trait]
impl ScanAdapter for CameraScanner {
    async fn start(&self, target: ScanTarget, on_success: OnScan) -> ScanResult<()> {
        let source = match target {
            ScanTarget::Frames(source) => source,
            other => {
                return Err(ScanError::UnsupportedTarget {
                    adapter: "camera",
                    target: other.kind(),
                });
            }
        };

        let mut running = self.running.lock().await;
        if let Some(current) = running.as_ref() {
            if !current.handle.is_finished() {
                return Err(ScanError::AlreadyActive);
            }
        }
        // Reap a stream that ended on its own
        if let Some(finished) = running.take() {
            let _ = finished.handle.await;
        }

        self.status.reset();
        self.status.set_active(true);

        let (shutdown, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run_stream(
            source,
            on_success,
            self.status.clone(),
            self.interval,
            shutdown_rx,
        ));
        *running = Some(Running { shutdown, handle });

        info!("Camera scanner started ({:?} interval)", self.interval);
        Ok(())
    }

    async fn stop(&self) {
        let running = self.running.lock().await.take();
        if let Some(Running { shutdown, handle }) = running {
            let _ = shutdown.send(());
            if let Err(e) = handle.await {
                error!("Camera scan task failed: {}", e);
            }
            info!("Camera scanner stopped");
        }
        self.status.set_active(false);
    }

    fn status(&self) -> ScanStatus {
        self.status.snapshot()
    }

    fn subscribe(&self) -> watch::Receiver<ScanStatus> {
        self.status.subscribe()
    }
}

async fn run_stream(
    mut source: Box<dyn FrameSource>,
    mut on_success: OnScan,
    status: StatusCell,
    interval: Duration,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        let frame = tokio::select! {
            _ = &mut shutdown => break,
            frame = source.next_frame() => frame,
        };

        match frame {
            Ok(Some(frame)) => {
                // An abandoned decode finishes on the blocking pool; its result is dropped
                let decode = tokio::task::spawn_blocking(move || decoder::decode_luma(&frame));
                let decoded = tokio::select! {
                    _ = &mut shutdown => break,
                    decoded = decode => decoded,
                };

                match decoded {
                    Ok(Ok(content)) => {
                        debug!("Decoded QR payload ({} chars)", content.chars().count());
                        status.record_result(&content);
                        on_success(content);
                    }
                    Ok(Err(ScanError::NotFound)) => {}
                    Ok(Err(e)) => debug!("Frame decode failed: {}", e),
                    Err(e) => error!("Frame decode task failed: {}", e),
                }
            }
            Ok(None) => {
                info!("Camera stream ended");
                break;
            }
            Err(e) => {
                error!("QR scanner error: {}", e);
                status.record_error(e.to_string());
                break;
            }
        }
    }

    source.release().await;
    status.set_active(false);
}
