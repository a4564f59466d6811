//! Custom error types for the scanners

use thiserror::Error;

/// Custom error type for scan operations
#[derive(Error, Debug)]
pub enum ScanError {
    /// The image or frame contains no readable QR code
    #[error("No QR code found")]
    NotFound,

    /// User-facing decode failure of the photo scanner
    #[error("{0}")]
    Decode(String),

    /// The image could not be read or parsed
    #[error("Failed to read image: {0}")]
    Image(#[from] image::ImageError),

    /// Camera access was refused
    #[error("Camera permission denied")]
    PermissionDenied,

    /// The frame source failed
    #[error("Camera error: {0}")]
    Source(String),

    /// The native barcode scanner failed
    #[error("Barcode scanner error: {0}")]
    Plugin(String),

    /// `start` was called on a running scanner
    #[error("Scanner is already active")]
    AlreadyActive,

    /// The target does not fit the scanner strategy
    #[error("The {adapter} scanner cannot scan a {target} target")]
    UnsupportedTarget {
        adapter: &'static str,
        target: &'static str,
    },

    /// The operation is not available on this platform
    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Result with ScanError
pub type ScanResult<T> = Result<T, ScanError>;
