//! QR decoding on top of `rqrr`

use image::{DynamicImage, GrayImage};
use std::path::Path;
use tracing::debug;

use crate::error::{ScanError, ScanResult};

/// Decode the first readable QR code in a greyscale image
pub fn decode_luma(image: &GrayImage) -> ScanResult<String> {
    let (width, height) = image.dimensions();
    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
            image.get_pixel(x as u32, y as u32).0[0]
        });

    for grid in prepared.detect_grids() {
        match grid.decode() {
            Ok((_, content)) => return Ok(content),
            Err(e) => debug!("Skipping unreadable QR grid: {}", e),
        }
    }

    Err(ScanError::NotFound)
}

pub fn decode_image(image: &DynamicImage) -> ScanResult<String> {
    decode_luma(&image.to_luma8())
}

/// Decode an encoded image (PNG, JPEG) held in memory
pub fn decode_bytes(bytes: &[u8]) -> ScanResult<String> {
    let image = image::load_from_memory(bytes)?;
    decode_image(&image)
}

pub fn decode_file(path: &Path) -> ScanResult<String> {
    let image = image::open(path)?;
    decode_image(&image)
}
