use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, Rgb};

use crate::effects::error::{EffectError, Result};
use crate::effects::frame::Frame;

/// Quality used for sidebar thumbnails.
const THUMBNAIL_QUALITY: u8 = 70;

/// Encode packed RGB pixel data to JPEG at the given quality (1-100).
fn encode_rgb_jpeg(data: Vec<u8>, width: u32, height: u32, quality: u8) -> Result<Vec<u8>> {
    let img: ImageBuffer<Rgb<u8>, _> = ImageBuffer::from_raw(width, height, data)
        .ok_or_else(|| EffectError::Encode("invalid buffer dimensions".to_string()))?;

    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    img.write_with_encoder(encoder)
        .map_err(|e| EffectError::Encode(format!("JPEG encoding failed: {e}")))?;
    Ok(buf)
}

/// Compress a processed frame to JPEG at the given quality (1-100).
pub fn compress_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>> {
    frame.ensure_processable()?;
    encode_rgb_jpeg(frame.to_rgb_vec()?, frame.width(), frame.height(), quality)
}

/// Compress and downscale a processed frame for sidebar thumbnails.
///
/// Uses `fast_image_resize` for SIMD-accelerated resizing, then encodes to JPEG.
pub fn compress_thumbnail(frame: &Frame, thumb_width: u32, thumb_height: u32) -> Result<Vec<u8>> {
    use fast_image_resize as fr;
    use fr::images::Image;

    frame.ensure_processable()?;
    if thumb_width == 0 || thumb_height == 0 {
        return Err(EffectError::Encode(format!(
            "thumbnail size {thumb_width}x{thumb_height} is empty"
        )));
    }

    let src_image = Image::from_vec_u8(
        frame.width(),
        frame.height(),
        frame.to_rgb_vec()?,
        fr::PixelType::U8x3,
    )
    .map_err(|e| EffectError::Encode(format!("thumbnail source: {e}")))?;

    let mut dst_image = Image::new(thumb_width, thumb_height, fr::PixelType::U8x3);

    let mut resizer = fr::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, None)
        .map_err(|e| EffectError::Encode(format!("resize failed: {e}")))?;

    encode_rgb_jpeg(
        dst_image.into_vec(),
        thumb_width,
        thumb_height,
        THUMBNAIL_QUALITY,
    )
}

/// Standard base64 for handing encoded frames to a web view.
pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
