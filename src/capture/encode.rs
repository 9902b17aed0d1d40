use crate::error::CaptureError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, RgbaImage};

pub const JPEG_MIME: &str = "image/jpeg";

/// Encode to JPEG at `quality`; alpha is dropped
pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, CaptureError> {
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut output = Vec::new();
    JpegEncoder::new_with_quality(&mut output, quality.clamp(1, 100))
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(|e| CaptureError::Encoding {
            details: format!("JPEG encoding failed: {}", e),
        })?;
    Ok(output)
}

/// Inline preview for immediate display
pub fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}
