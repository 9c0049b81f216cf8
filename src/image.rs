//! Captured image normalization
//!
//! Raster payloads are normalized once at capture time: downscaled to a
//! bounded dimension and re-encoded as PNG. This caps both resident memory
//! and persisted snapshot size, and gives the store a single canonical
//! format to hash and compare.

use anyhow::{Context, Result};
use std::io::Cursor;
use tracing::debug;

/// Raw RGBA pixels as read from the external resource, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8, `width * height * 4` bytes.
    pub rgba: Vec<u8>,
}

impl RawImage {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Self {
        RawImage { width, height, rgba }
    }
}

/// Encode a captured image as PNG, downscaling first when either dimension
/// exceeds `max_dimension` (aspect ratio preserved).
pub fn encode_normalized_png(raw: &RawImage, max_dimension: u32) -> Result<Vec<u8>> {
    let rgba = image::RgbaImage::from_raw(raw.width, raw.height, raw.rgba.clone())
        .context("Failed to create RGBA image from captured data")?;

    let mut dynamic = image::DynamicImage::ImageRgba8(rgba);
    if raw.width > max_dimension || raw.height > max_dimension {
        dynamic = dynamic.thumbnail(max_dimension, max_dimension);
    }

    let output = dynamic.into_rgba8();
    if (output.width(), output.height()) != (raw.width, raw.height) {
        debug!(
            from_width = raw.width,
            from_height = raw.height,
            to_width = output.width(),
            to_height = output.height(),
            "Downscaled captured image"
        );
    }

    let mut png_data = Vec::new();
    let mut cursor = Cursor::new(&mut png_data);
    output
        .write_to(&mut cursor, image::ImageFormat::Png)
        .context("Failed to encode image as PNG")?;

    Ok(png_data)
}

/// Decode a stored PNG payload back to raw RGBA for writing to the
/// external resource. Returns None on malformed data.
pub fn decode_png(png_bytes: &[u8]) -> Option<RawImage> {
    let img = image::load_from_memory_with_format(png_bytes, image::ImageFormat::Png).ok()?;
    let rgba = img.to_rgba8();
    let (width, height) = (rgba.width(), rgba.height());
    Some(RawImage {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}

/// Extract dimensions from a PNG header without a full decode.
pub fn png_dimensions(png_bytes: &[u8]) -> Option<(u32, u32)> {
    let cursor = Cursor::new(png_bytes);
    let reader = image::ImageReader::with_format(cursor, image::ImageFormat::Png);
    reader.into_dimensions().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_image(width: u32, height: u32) -> RawImage {
        RawImage::new(width, height, vec![128u8; (width * height * 4) as usize])
    }

    #[test]
    fn test_small_image_is_not_resized() {
        let raw = solid_image(100, 50);
        let png = encode_normalized_png(&raw, 512).expect("encode");
        assert_eq!(png_dimensions(&png), Some((100, 50)));
    }

    #[test]
    fn test_oversize_image_downscales_preserving_aspect() {
        let raw = solid_image(1024, 512);
        let png = encode_normalized_png(&raw, 512).expect("encode");
        assert_eq!(png_dimensions(&png), Some((512, 256)));
    }

    #[test]
    fn test_tall_image_bounded_by_height() {
        let raw = solid_image(256, 1024);
        let png = encode_normalized_png(&raw, 512).expect("encode");
        assert_eq!(png_dimensions(&png), Some((128, 512)));
    }

    #[test]
    fn test_truncated_pixel_buffer_is_rejected() {
        let raw = RawImage::new(10, 10, vec![0u8; 10]);
        assert!(encode_normalized_png(&raw, 512).is_err());
    }

    #[test]
    fn test_png_roundtrip() {
        let raw = RawImage::new(
            2,
            2,
            vec![
                255, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255, 255, 255, 255, 255,
            ],
        );
        let png = encode_normalized_png(&raw, 512).expect("encode");
        let back = decode_png(&png).expect("decode");
        assert_eq!(back.width, 2);
        assert_eq!(back.height, 2);
        assert_eq!(back.rgba, raw.rgba);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_png(b"definitely not a png").is_none());
        assert!(png_dimensions(b"nope").is_none());
    }
}
