use crate::models::config::VideoCodecConfig;
use crate::models::error::RecordError;
use crate::models::media::{PixelBuffer, VideoImage};

/// Converts rendered images into the pixel layout the video encoder consumes.
pub trait PixelConverter: Send + Sync {
    fn convert(&self, image: &VideoImage, target: &VideoCodecConfig) -> Result<PixelBuffer, RecordError>;
}
