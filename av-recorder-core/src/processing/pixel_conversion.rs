use crate::models::config::VideoCodecConfig;
use crate::models::error::RecordError;
use crate::models::media::{PixelBuffer, PixelFormat, VideoImage};
use crate::traits::pixel_converter::PixelConverter;

/// Converts 8-bit RGBA/BGRA/ARGB images into 32-bit ARGB pixel buffers.
///
/// The image must match the configured video dimensions exactly; the encoder
/// is set up once per session and never rescales.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArgbConverter;

impl ArgbConverter {
    pub fn new() -> Self {
        Self
    }
}

impl PixelConverter for ArgbConverter {
    fn convert(&self, image: &VideoImage, target: &VideoCodecConfig) -> Result<PixelBuffer, RecordError> {
        if target.pixel_format != PixelFormat::Argb8 {
            return Err(RecordError::PixelConversion(format!(
                "unsupported target format {:?}",
                target.pixel_format
            )));
        }
        if image.width != target.width || image.height != target.height {
            return Err(RecordError::PixelConversion(format!(
                "image is {}x{}, encoder expects {}x{}",
                image.width, image.height, target.width, target.height
            )));
        }
        if image.data.len() != image.expected_len() {
            return Err(RecordError::PixelConversion(format!(
                "image buffer holds {} bytes, expected {}",
                image.data.len(),
                image.expected_len()
            )));
        }

        let data = match image.format {
            PixelFormat::Argb8 => image.data.clone(),
            PixelFormat::Rgba8 => swizzle(&image.data, [3, 0, 1, 2]),
            PixelFormat::Bgra8 => swizzle(&image.data, [3, 2, 1, 0]),
        };

        Ok(PixelBuffer {
            width: image.width,
            height: image.height,
            format: PixelFormat::Argb8,
            bytes_per_row: image.width as usize * PixelFormat::BYTES_PER_PIXEL,
            data,
        })
    }
}

/// Reorder each 4-byte pixel: output byte `i` is input byte `order[i]`.
fn swizzle(data: &[u8], order: [usize; 4]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for px in data.chunks_exact(PixelFormat::BYTES_PER_PIXEL) {
        out.extend_from_slice(&[px[order[0]], px[order[1]], px[order[2]], px[order[3]]]);
    }
    out
}
