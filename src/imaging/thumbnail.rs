use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{imageops::FilterType, DynamicImage, ImageFormat, Rgb, RgbImage, RgbaImage};

use super::watermark::apply_watermark;
use super::{ImagingError, WatermarkPosition};

/// Decode `source`, fit it inside a `size`×`size` box, optionally watermark, and encode as JPEG.
/// Images already inside the box are not enlarged.
pub fn render_thumbnail(
    source: &[u8],
    size: u32,
    watermark: Option<&RgbaImage>,
    position: WatermarkPosition,
    quality: u8,
) -> Result<Vec<u8>, ImagingError> {
    if size == 0 {
        return Err(ImagingError::ZeroSize);
    }

    let mut image = image::load_from_memory(source)?;
    if image.width() > size || image.height() > size {
        image = image.resize(size, size, FilterType::Lanczos3);
    }

    if let Some(mark) = watermark {
        image = apply_watermark(&image, mark, position);
    }

    encode_jpeg(&image, quality)
}

pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImagingError> {
    // JPEG has no alpha channel
    let rgb = image.to_rgb8();
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).encode_image(&rgb)?;
    Ok(buffer)
}

/// Bytes of the error placeholder: the configured PNG, or a plain grey square.
pub fn fallback_png(path: Option<&Path>) -> Result<Vec<u8>, ImagingError> {
    if let Some(path) = path {
        match std::fs::read(path) {
            Ok(bytes) => return Ok(bytes),
            Err(e) => tracing::warn!(path = %path.display(), "fallback image unreadable, generating one: {}", e),
        }
    }

    let placeholder = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([204, 204, 204])));
    let mut buffer = Cursor::new(Vec::new());
    placeholder.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}
