//! Prepares exported photos for the vision model: decode, resample to the
//! model input width, then encode as base64 JPEG.

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat, imageops::FilterType};
use std::{fs::read, io::Cursor, path::Path};

// ────────────────────────────────────────────────────────────────
// Public API
// ────────────────────────────────────────────────────────────────

/// Decode, resample and encode an exported image as base64 JPEG.
pub fn prepare_for_model(path: &Path, target_width: u32) -> Result<String> {
    let dynamic_image = decode_image(path)?;
    let resampled = resample_to_width(&dynamic_image, target_width);
    encode_jpeg_base64(&resampled).context("failed to encode resampled image")
}

// ────────────────────────────────────────────────────────────────
// Decoding
// ────────────────────────────────────────────────────────────────

pub fn decode_image(file_path: &Path) -> Result<DynamicImage> {
    let file_in_memory =
        read(file_path).context(format!("failed to read file into memory: {:?}", file_path))?;
    image::load_from_memory(&file_in_memory)
        .context(format!("failed to decode image {:?}", file_path))
}

// ────────────────────────────────────────────────────────────────
// Resampling
// ────────────────────────────────────────────────────────────────

/// Scale so the width equals `target_width`, keeping the aspect ratio
pub fn resample_to_width(dynamic_image: &DynamicImage, target_width: u32) -> DynamicImage {
    let (width, height) = scaled_width_height(dynamic_image.width(), dynamic_image.height(), target_width);
    dynamic_image.resize_exact(width, height, FilterType::Lanczos3)
}

/// Height is rounded down and never drops below one pixel.
pub fn scaled_width_height(width: u32, height: u32, target_width: u32) -> (u32, u32) {
    if width == 0 {
        return (target_width, height.max(1));
    }
    let scaled_height = (u64::from(height) * u64::from(target_width) / u64::from(width)) as u32;
    (target_width, scaled_height.max(1))
}

// ────────────────────────────────────────────────────────────────
// Encoding
// ────────────────────────────────────────────────────────────────

pub fn encode_jpeg_base64(dynamic_image: &DynamicImage) -> Result<String> {
    // The JPEG encoder has no alpha channel support.
    let rgb_image = DynamicImage::ImageRgb8(dynamic_image.to_rgb8());
    let mut buffer = Cursor::new(Vec::new());
    rgb_image
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .context("failed to encode image as JPEG")?;
    Ok(STANDARD.encode(buffer.into_inner()))
}
