//! Integration tests for the scanner strategies
//!
//! QR images are rendered with `qrcode` so every test decodes real codes.

use async_trait::async_trait;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use qrcode::{Color, QrCode};
use scanner::photo::{NO_QR_CODE_MESSAGE, SCAN_FAILED_MESSAGE};
use scanner::native::PERMISSION_DENIED_MESSAGE;
use scanner::{
    BarcodePlugin, CameraScanner, FrameSequence, FrameSource, NativeScanner, OnScan,
    PermissionState, PhotoScanner, ScanAdapter, ScanError, ScanOptions, ScanResult, ScanTarget,
    Scanner, ScannerKind, StaticFrames, scan_once,
};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

const PAYLOAD: &str = "https://signin.example.com/scan?session=42";
const SCALE: u32 = 6;
const QUIET_ZONE: u32 = 4;

fn render_qr(data: &str) -> GrayImage {
    let code = QrCode::new(data.as_bytes()).expect("encode QR code");
    let width = code.width() as u32;
    let colors = code.to_colors();
    let size = (width + 2 * QUIET_ZONE) * SCALE;

    GrayImage::from_fn(size, size, |x, y| {
        let (mx, my) = (x / SCALE, y / SCALE);
        let inside = (QUIET_ZONE..QUIET_ZONE + width).contains(&mx)
            && (QUIET_ZONE..QUIET_ZONE + width).contains(&my);
        if inside {
            let index = ((my - QUIET_ZONE) * width + (mx - QUIET_ZONE)) as usize;
            if colors[index] == Color::Dark {
                return Luma([0]);
            }
        }
        Luma([255])
    })
}

fn blank() -> GrayImage {
    GrayImage::from_pixel(120, 120, Luma([255]))
}

fn png_bytes(image: GrayImage) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(image)
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("encode png");
    bytes.into_inner()
}

fn collector() -> (Arc<Mutex<Vec<String>>>, OnScan) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, Box::new(move |content| sink.lock().unwrap().push(content)))
}

async fn wait_until_idle<A: ScanAdapter>(adapter: &A) {
    let mut rx = adapter.subscribe();
    tokio::time::timeout(Duration::from_secs(10), rx.wait_for(|status| !status.is_active))
        .await
        .expect("scanner did not stop in time")
        .expect("status channel closed");
}

/// Frame source that records its release and can fail on demand
struct TrackedSource {
    frames: StaticFrames,
    released: Arc<AtomicBool>,
    fail_after: Option<usize>,
    served: usize,
}

impl TrackedSource {
    fn new(frames: StaticFrames) -> (Self, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        (
            Self {
                frames,
                released: released.clone(),
                fail_after: None,
                served: 0,
            },
            released,
        )
    }
}

#[async_trait]
impl FrameSource for TrackedSource {
    async fn next_frame(&mut self) -> ScanResult<Option<GrayImage>> {
        if self.fail_after == Some(self.served) {
            return Err(ScanError::Source("camera unplugged".to_string()));
        }
        self.served += 1;
        self.frames.next_frame().await
    }

    async fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_photo_scan_file_decodes_payload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("code.png");
    render_qr(PAYLOAD).save(&path).unwrap();

    let scanner = PhotoScanner::new();
    let (seen, on_success) = collector();
    scanner.scan_file(&path, on_success).await.expect("scan photo");

    assert_eq!(*seen.lock().unwrap(), vec![PAYLOAD.to_string()]);
    let status = scanner.status();
    assert!(!status.is_active);
    assert_eq!(status.last_result.as_deref(), Some(PAYLOAD));
    assert_eq!(status.last_error, None);
}

#[tokio::test]
async fn test_photo_scan_of_encoded_bytes() {
    let scanner = PhotoScanner::new();
    let (seen, on_success) = collector();
    scanner
        .start(ScanTarget::ImageBytes(png_bytes(render_qr("bytes"))), on_success)
        .await
        .expect("scan bytes");

    assert_eq!(*seen.lock().unwrap(), vec!["bytes".to_string()]);
}

#[tokio::test]
async fn test_photo_without_code_reports_guidance() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blank.png");
    blank().save(&path).unwrap();

    let scanner = PhotoScanner::new();
    let (seen, on_success) = collector();
    let err = scanner.scan_file(&path, on_success).await.unwrap_err();

    assert!(matches!(&err, ScanError::Decode(message) if message == NO_QR_CODE_MESSAGE));
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(
        scanner.status().last_error.as_deref(),
        Some(NO_QR_CODE_MESSAGE)
    );
}

#[tokio::test]
async fn test_photo_missing_file_reports_generic_failure() {
    let scanner = PhotoScanner::new();
    let err = scanner
        .scan_file("/nonexistent/code.png", Box::new(|_| {}))
        .await
        .unwrap_err();
    assert!(matches!(&err, ScanError::Decode(message) if message == SCAN_FAILED_MESSAGE));
}

#[tokio::test]
async fn test_photo_new_scan_clears_previous_error() {
    let scanner = PhotoScanner::new();
    let _ = scanner
        .start(ScanTarget::ImageBytes(png_bytes(blank())), Box::new(|_| {}))
        .await;
    assert!(scanner.status().last_error.is_some());

    scanner
        .start(ScanTarget::ImageBytes(png_bytes(render_qr("again"))), Box::new(|_| {}))
        .await
        .expect("second scan");
    let status = scanner.status();
    assert_eq!(status.last_error, None);
    assert_eq!(status.last_result.as_deref(), Some("again"));
}

#[tokio::test]
async fn test_camera_reports_every_decode_until_stream_ends() {
    let frames = StaticFrames::new(vec![
        blank(),
        render_qr("first"),
        blank(),
        render_qr("second"),
    ]);
    let (source, released) = TrackedSource::new(frames);

    let scanner = CameraScanner::new(Duration::from_millis(1));
    let (seen, on_success) = collector();
    scanner
        .start(ScanTarget::Frames(Box::new(source)), on_success)
        .await
        .expect("start camera");

    wait_until_idle(&scanner).await;

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["first".to_string(), "second".to_string()]
    );
    assert!(released.load(Ordering::SeqCst));
    let status = scanner.status();
    assert_eq!(status.last_result.as_deref(), Some("second"));
    assert_eq!(status.last_error, None);
}

#[tokio::test]
async fn test_camera_rejects_second_start_and_stops_cleanly() {
    let (source, released) = TrackedSource::new(StaticFrames::looping(vec![blank()]));
    let scanner = CameraScanner::new(Duration::from_millis(5));
    scanner
        .start(ScanTarget::Frames(Box::new(source)), Box::new(|_| {}))
        .await
        .expect("start camera");
    assert!(scanner.status().is_active);

    let again = scanner
        .start(
            ScanTarget::Frames(Box::new(StaticFrames::new(vec![]))),
            Box::new(|_| {}),
        )
        .await;
    assert!(matches!(again, Err(ScanError::AlreadyActive)));

    scanner.stop().await;
    assert!(!scanner.status().is_active);
    assert!(released.load(Ordering::SeqCst));

    // A stopped scanner can be started again
    let (source, _) = TrackedSource::new(StaticFrames::looping(vec![render_qr("restart")]));
    let payload = scan_once(&scanner, ScanTarget::Frames(Box::new(source)))
        .await
        .expect("restart");
    assert_eq!(payload, "restart");
    assert!(!scanner.status().is_active);
}

#[tokio::test]
async fn test_camera_source_failure_is_recorded() {
    let (mut source, released) = TrackedSource::new(StaticFrames::looping(vec![blank()]));
    source.fail_after = Some(2);

    let scanner = CameraScanner::new(Duration::from_millis(1));
    scanner
        .start(ScanTarget::Frames(Box::new(source)), Box::new(|_| {}))
        .await
        .expect("start camera");
    wait_until_idle(&scanner).await;

    let status = scanner.status();
    assert!(!status.is_active);
    assert!(
        status
            .last_error
            .as_deref()
            .is_some_and(|e| e.contains("camera unplugged"))
    );
    assert!(released.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_dropping_camera_releases_source() {
    let (source, released) = TrackedSource::new(StaticFrames::looping(vec![blank()]));
    let scanner = CameraScanner::new(Duration::from_millis(5));
    scanner
        .start(ScanTarget::Frames(Box::new(source)), Box::new(|_| {}))
        .await
        .expect("start camera");
    drop(scanner);

    tokio::time::timeout(Duration::from_secs(5), async {
        while !released.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("source released after drop");
}

#[tokio::test]
async fn test_decoding_does_not_block_runtime_or_stop() {
    let large = GrayImage::from_pixel(3000, 3000, Luma([255]));
    let (source, released) = TrackedSource::new(StaticFrames::looping(vec![large]));
    let scanner = CameraScanner::new(Duration::from_millis(1));
    scanner
        .start(ScanTarget::Frames(Box::new(source)), Box::new(|_| {}))
        .await
        .expect("start camera");

    // Timers keep firing while frames are decoded
    for _ in 0..5 {
        let started = Instant::now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(started.elapsed() < Duration::from_millis(150));
    }

    let started = Instant::now();
    scanner.stop().await;
    assert!(started.elapsed() < Duration::from_millis(150));
    assert!(released.load(Ordering::SeqCst));
    assert!(!scanner.status().is_active);
}

#[tokio::test]
async fn test_scan_once_on_stream_without_code() {
    let scanner = CameraScanner::new(Duration::from_millis(1));
    let frames = StaticFrames::new(vec![blank(), blank()]);
    let result = scan_once(&scanner, ScanTarget::Frames(Box::new(frames))).await;
    assert!(matches!(result, Err(ScanError::NotFound)));
}

#[tokio::test]
async fn test_frame_sequence_plays_directory_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    blank().save(dir.path().join("frame-001.png")).unwrap();
    render_qr("from disk").save(dir.path().join("frame-002.png")).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let frames = FrameSequence::from_dir(dir.path()).expect("frame sequence");
    assert_eq!(frames.len(), 2);

    let scanner = Scanner::camera(Duration::from_millis(1));
    let payload = scan_once(&scanner, ScanTarget::Frames(Box::new(frames)))
        .await
        .expect("scan frames");
    assert_eq!(payload, "from disk");
}

#[test]
fn test_frame_sequence_requires_frames() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        FrameSequence::from_dir(dir.path()),
        Err(ScanError::Source(_))
    ));
}

/// Scripted barcode plugin
#[derive(Default)]
struct FakePlugin {
    check: Mutex<Option<PermissionState>>,
    request: Mutex<Option<PermissionState>>,
    result: Mutex<Option<String>>,
    block_until_cancel: bool,
    cancelled: Notify,
    calls: Mutex<Vec<&'static str>>,
}

impl FakePlugin {
    fn granting(result: Option<&str>) -> Self {
        let plugin = Self::default();
        *plugin.check.lock().unwrap() = Some(PermissionState::Granted);
        *plugin.result.lock().unwrap() = result.map(str::to_string);
        plugin
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl BarcodePlugin for FakePlugin {
    async fn check_permissions(&self) -> ScanResult<PermissionState> {
        self.record("check");
        Ok(self.check.lock().unwrap().unwrap_or(PermissionState::Denied))
    }

    async fn request_permissions(&self) -> ScanResult<PermissionState> {
        self.record("request");
        Ok(self.request.lock().unwrap().unwrap_or(PermissionState::Denied))
    }

    async fn open_app_settings(&self) -> ScanResult<()> {
        self.record("settings");
        Ok(())
    }

    async fn scan(&self, options: &ScanOptions) -> ScanResult<Option<String>> {
        self.record("scan");
        assert_eq!(*options, ScanOptions::qr_only());
        if self.block_until_cancel {
            self.cancelled.notified().await;
            return Ok(None);
        }
        Ok(self.result.lock().unwrap().clone())
    }

    async fn cancel(&self) -> ScanResult<()> {
        self.record("cancel");
        self.cancelled.notify_one();
        Err(ScanError::Plugin("cancel not supported".to_string()))
    }
}

#[tokio::test]
async fn test_native_scan_with_granted_permission() {
    let plugin = Arc::new(FakePlugin::granting(Some(PAYLOAD)));
    let scanner = NativeScanner::new(plugin.clone());
    let (seen, on_success) = collector();

    scanner
        .start(ScanTarget::Device, on_success)
        .await
        .expect("native scan");

    assert_eq!(*seen.lock().unwrap(), vec![PAYLOAD.to_string()]);
    assert_eq!(plugin.calls(), vec!["check", "scan"]);
    let status = scanner.status();
    assert!(!status.is_active);
    assert_eq!(status.last_result.as_deref(), Some(PAYLOAD));
}

#[tokio::test]
async fn test_native_requests_permission_when_prompt_is_possible() {
    let plugin = Arc::new(FakePlugin::default());
    *plugin.check.lock().unwrap() = Some(PermissionState::PromptWithRationale);
    *plugin.request.lock().unwrap() = Some(PermissionState::Granted);
    *plugin.result.lock().unwrap() = Some("granted".to_string());

    let scanner = NativeScanner::new(plugin.clone());
    let payload = scan_once(&scanner, ScanTarget::Device)
        .await
        .expect("native scan");

    assert_eq!(payload, "granted");
    assert_eq!(plugin.calls(), vec!["check", "request", "scan"]);
}

#[tokio::test]
async fn test_native_denial_offers_settings() {
    let plugin = Arc::new(FakePlugin::default());
    *plugin.check.lock().unwrap() = Some(PermissionState::Prompt);
    *plugin.request.lock().unwrap() = Some(PermissionState::Denied);

    let asked = Arc::new(AtomicBool::new(false));
    let flag = asked.clone();
    let scanner = NativeScanner::new(plugin.clone()).with_settings_prompt(Box::new(move || {
        flag.store(true, Ordering::SeqCst);
        true
    }));

    let (seen, on_success) = collector();
    let result = scanner.start(ScanTarget::Device, on_success).await;

    assert!(matches!(result, Err(ScanError::PermissionDenied)));
    assert!(asked.load(Ordering::SeqCst));
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(plugin.calls(), vec!["check", "request", "settings"]);
    assert_eq!(
        scanner.status().last_error.as_deref(),
        Some(PERMISSION_DENIED_MESSAGE)
    );
}

#[tokio::test]
async fn test_native_denial_without_prompt_keeps_settings_closed() {
    let plugin = Arc::new(FakePlugin::default());
    let scanner = NativeScanner::new(plugin.clone());

    let result = scanner.start(ScanTarget::Device, Box::new(|_| {})).await;

    assert!(matches!(result, Err(ScanError::PermissionDenied)));
    assert_eq!(plugin.calls(), vec!["check"]);
}

#[tokio::test]
async fn test_native_cancelled_scan_is_not_an_error() {
    let plugin = Arc::new(FakePlugin::granting(None));
    let scanner = NativeScanner::new(plugin);
    let (seen, on_success) = collector();

    scanner
        .start(ScanTarget::Device, on_success)
        .await
        .expect("cancelled scan");
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(scanner.status().last_result, None);
}

#[tokio::test]
async fn test_native_stop_cancels_running_scan() {
    let mut plugin = FakePlugin::granting(None);
    plugin.block_until_cancel = true;
    let plugin = Arc::new(plugin);
    let scanner = Arc::new(NativeScanner::new(plugin.clone()));

    // Idle stop does not reach the plugin
    scanner.stop().await;
    assert!(plugin.calls().is_empty());

    let mut rx = scanner.subscribe();
    let running = {
        let scanner = scanner.clone();
        tokio::spawn(async move { scanner.start(ScanTarget::Device, Box::new(|_| {})).await })
    };
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|status| status.is_active))
        .await
        .expect("scan started")
        .expect("status channel open");

    // The plugin's cancel error is only logged
    scanner.stop().await;
    let outcome = running.await.expect("scan task");
    assert!(outcome.is_ok());
    assert!(!scanner.status().is_active);
    assert_eq!(plugin.calls(), vec!["check", "scan", "cancel"]);
}

#[tokio::test]
async fn test_native_rejects_frame_targets() {
    let scanner = NativeScanner::new(Arc::new(FakePlugin::granting(None)));
    let result = scanner
        .start(
            ScanTarget::Frames(Box::new(StaticFrames::new(vec![]))),
            Box::new(|_| {}),
        )
        .await;
    assert!(matches!(
        result,
        Err(ScanError::UnsupportedTarget { adapter: "native", .. })
    ));
}

#[tokio::test]
async fn test_scanner_variant_delegates() {
    let scanner = Scanner::photo();
    assert_eq!(scanner.kind(), ScannerKind::Photo);

    let payload = scan_once(
        &scanner,
        ScanTarget::ImageBytes(png_bytes(render_qr("variant"))),
    )
    .await
    .expect("scan through variant");
    assert_eq!(payload, "variant");
    assert_eq!(scanner.status().last_result.as_deref(), Some("variant"));
}
