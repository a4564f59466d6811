//! Native barcode scanning with a camera permission flow
//!
//! [`NativeScanner`] drives a [`BarcodePlugin`]: it checks the camera
//! permission, requests it when the platform can still prompt, offers to open
//! the system settings after a denial, and runs one QR-only scan.
//!
//! [`ZbarPlugin`] is the desktop plugin. It runs `zbarcam` against a video
//! device and reads the decoded payload from its standard output.

use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::adapter::{OnScan, ScanAdapter, ScanStatus, ScanTarget, StatusCell};
use crate::error::{ScanError, ScanResult};

/// Reported when the camera permission stays denied
pub const PERMISSION_DENIED_MESSAGE: &str =
    "Camera permission denied. Enable it manually in settings.";

const ZBARCAM: &str = "zbarcam";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    Prompt,
    PromptWithRationale,
}

impl PermissionState {
    /// The platform may still ask the user
    pub fn can_prompt(self) -> bool {
        matches!(self, PermissionState::Prompt | PermissionState::PromptWithRationale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarcodeFormat {
    QrCode,
}

/// Options of a single native scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Render the camera preview inside the application window
    pub windowed: bool,
    pub formats: Vec<BarcodeFormat>,
}

impl ScanOptions {
    pub fn qr_only() -> Self {
        Self {
            windowed: false,
            formats: vec![BarcodeFormat::QrCode],
        }
    }
}

/// Platform barcode scanner
#[async_trait]
pub trait BarcodePlugin: Send + Sync {
    async fn check_permissions(&self) -> ScanResult<PermissionState>;

    async fn request_permissions(&self) -> ScanResult<PermissionState>;

    async fn open_app_settings(&self) -> ScanResult<()>;

    /// Run one scan; `None` when it was cancelled without a result
    async fn scan(&self, options: &ScanOptions) -> ScanResult<Option<String>>;

    async fn cancel(&self) -> ScanResult<()>;
}

/// Asks the user whether to open the system settings after a denial
pub type SettingsPrompt = Box<dyn Fn() -> bool + Send + Sync>;

/// Scanner backed by a [`BarcodePlugin`]
pub struct NativeScanner {
    plugin: Arc<dyn BarcodePlugin>,
    status: StatusCell,
    settings_prompt: Option<SettingsPrompt>,
}

impl NativeScanner {
    pub fn new(plugin: Arc<dyn BarcodePlugin>) -> Self {
        Self {
            plugin,
            status: StatusCell::default(),
            settings_prompt: None,
        }
    }

    /// Consult `prompt` before opening the settings after a denial
    pub fn with_settings_prompt(mut self, prompt: SettingsPrompt) -> Self {
        self.settings_prompt = Some(prompt);
        self
    }

    pub async fn check_camera_permission(&self) -> ScanResult<PermissionState> {
        self.plugin.check_permissions().await.map_err(|e| {
            error!("Failed to check camera permission: {}", e);
            e
        })
    }

    pub async fn request_camera_permission(&self) -> ScanResult<PermissionState> {
        self.plugin.request_permissions().await.map_err(|e| {
            error!("Failed to request camera permission: {}", e);
            e
        })
    }

    pub async fn open_settings(&self) -> ScanResult<()> {
        self.plugin.open_app_settings().await.map_err(|e| {
            error!("Failed to open app settings: {}", e);
            e
        })
    }

    async fn ensure_permission(&self) -> ScanResult<()> {
        let mut state = self.check_camera_permission().await?;
        if state.can_prompt() {
            state = self.request_camera_permission().await?;
        }

        if state == PermissionState::Granted {
            return Ok(());
        }

        warn!("Camera permission is {:?}", state);
        self.status.record_error(PERMISSION_DENIED_MESSAGE);
        let open = self.settings_prompt.as_ref().is_some_and(|prompt| prompt());
        if open {
            if let Err(e) = self.open_settings().await {
                warn!("Could not open settings: {}", e);
            }
        }
        Err(ScanError::PermissionDenied)
    }

    async fn run_scan(&self, on_success: &mut OnScan) -> ScanResult<()> {
        self.ensure_permission().await?;

        self.status.set_active(true);
        match self.plugin.scan(&ScanOptions::qr_only()).await {
            Ok(Some(content)) if !content.is_empty() => {
                info!("Native scan decoded a payload");
                self.status.record_result(&content);
                on_success(content);
                Ok(())
            }
            Ok(_) => {
                info!("Native scan finished without a result");
                Ok(())
            }
            Err(e) => {
                error!("Native scan failed: {}", e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl ScanAdapter for NativeScanner {
    async fn start(&self, target: ScanTarget, mut on_success: OnScan) -> ScanResult<()> {
        if !matches!(target, ScanTarget::Device) {
            return Err(ScanError::UnsupportedTarget {
                adapter: "native",
                target: target.kind(),
            });
        }

        self.status.reset();
        let outcome = self.run_scan(&mut on_success).await;
        if let Err(e) = &outcome {
            if self.status.snapshot().last_error.is_none() {
                self.status.record_error(e.to_string());
            }
        }
        self.status.set_active(false);
        outcome
    }

    async fn stop(&self) {
        if self.status.snapshot().is_active {
            if let Err(e) = self.plugin.cancel().await {
                error!("Failed to cancel native scan: {}", e);
            }
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

/// Desktop plugin running `zbarcam` on a V4L2 device
pub struct ZbarPlugin {
    device: PathBuf,
    program: PathBuf,
    /// Set by `cancel`; cleared when a scan ends
    cancel: watch::Sender<bool>,
}

impl ZbarPlugin {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            program: PathBuf::from(ZBARCAM),
            cancel: watch::channel(false).0,
        }
    }

    /// Use another `zbarcam` binary
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn device(&self) -> &Path {
        &self.device
    }

    async fn device_permission(&self) -> ScanResult<PermissionState> {
        match tokio::fs::OpenOptions::new()
            .read(true)
            .open(&self.device)
            .await
        {
            Ok(_) => Ok(PermissionState::Granted),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Ok(PermissionState::Denied)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ScanError::Unsupported(
                format!("video device {} not found", self.device.display()),
            )),
            Err(e) => Err(ScanError::Io(e)),
        }
    }
}

#[async_trait]
impl BarcodePlugin for ZbarPlugin {
    async fn check_permissions(&self) -> ScanResult<PermissionState> {
        self.device_permission().await
    }

    /// Device access cannot be granted at runtime
    async fn request_permissions(&self) -> ScanResult<PermissionState> {
        self.device_permission().await
    }

    async fn open_app_settings(&self) -> ScanResult<()> {
        Err(ScanError::Unsupported(format!(
            "grant read access to {} (for example through the `video` group)",
            self.device.display()
        )))
    }

    /// A cancel issued before the child starts still ends this scan
    async fn scan(&self, options: &ScanOptions) -> ScanResult<Option<String>> {
        let outcome = self.run_zbarcam(options).await;
        self.cancel.send_replace(false);
        outcome
    }

    async fn cancel(&self) -> ScanResult<()> {
        self.cancel.send_replace(true);
        Ok(())
    }
}

impl ZbarPlugin {
    async fn run_zbarcam(&self, options: &ScanOptions) -> ScanResult<Option<String>> {
        let mut cancelled = self.cancel.subscribe();
        let mut command = Command::new(&self.program);
        command.args(["--oneshot", "--raw", "-Sdisable"]);
        for format in &options.formats {
            match format {
                BarcodeFormat::QrCode => command.arg("-Sqrcode.enable"),
            };
        }
        if !options.windowed {
            command.arg("--nodisplay");
        }

        let mut child = command
            .arg(&self.device)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ScanError::Plugin(format!("failed to start {}: {}", ZBARCAM, e)))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| ScanError::Plugin(format!("{} has no output", ZBARCAM)))?;

        let mut output = String::new();
        let read = tokio::select! {
            _ = cancelled.wait_for(|cancelled| *cancelled) => None,
            read = stdout.read_to_string(&mut output) => Some(read),
        };

        let Some(read) = read else {
            child.kill().await?;
            info!("{} cancelled", ZBARCAM);
            return Ok(None);
        };
        read?;

        let status = child.wait().await?;
        if !status.success() {
            return Err(ScanError::Plugin(format!("{} exited with {}", ZBARCAM, status)));
        }

        let content = output.trim_end_matches(['\r', '\n']);
        Ok((!content.is_empty()).then(|| content.to_string()))
    }
}

/// `zbarcam` is installed on `PATH`
pub fn native_available() -> bool {
    std::env::var_os("PATH")
        .map(|path| find_on_path(ZBARCAM, &path).is_some())
        .unwrap_or(false)
}

fn find_on_path(program: &str, path: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(path)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
