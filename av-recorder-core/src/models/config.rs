use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::media::{AudioChunk, MediaTime, PixelFormat};

/// Video codec identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    H264,
    Hevc,
}

impl VideoCodec {
    pub fn fourcc(self) -> [u8; 4] {
        match self {
            Self::H264 => *b"avc1",
            Self::Hevc => *b"hvc1",
        }
    }

    pub fn from_fourcc(fourcc: [u8; 4]) -> Option<Self> {
        match &fourcc {
            b"avc1" => Some(Self::H264),
            b"hvc1" => Some(Self::Hevc),
            _ => None,
        }
    }
}

/// Audio codec identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Aac,
    Pcm16,
}

impl AudioCodec {
    pub fn fourcc(self) -> [u8; 4] {
        match self {
            Self::Aac => *b"mp4a",
            Self::Pcm16 => *b"lpcm",
        }
    }

    pub fn from_fourcc(fourcc: [u8; 4]) -> Option<Self> {
        match &fourcc {
            b"mp4a" => Some(Self::Aac),
            b"lpcm" => Some(Self::Pcm16),
            _ => None,
        }
    }
}

/// Video track settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoCodecConfig {
    pub codec: VideoCodec,
    pub width: u32,
    pub height: u32,
    /// Pixel layout the encoder expects from converted frames.
    pub pixel_format: PixelFormat,
}

impl Default for VideoCodecConfig {
    fn default() -> Self {
        Self {
            codec: VideoCodec::H264,
            width: 1280,
            height: 720,
            pixel_format: PixelFormat::Argb8,
        }
    }
}

/// Audio track settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioCodecConfig {
    pub codec: AudioCodec,
    pub channels: u16,
    pub sample_rate: f64,
    pub bit_rate: u32,
}

impl Default for AudioCodecConfig {
    fn default() -> Self {
        Self {
            codec: AudioCodec::Aac,
            channels: 2,
            sample_rate: 44100.0,
            bit_rate: 192_000,
        }
    }
}

/// Codec settings for one track, as passed to `ContainerWriter::add_track`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CodecConfig {
    Video(VideoCodecConfig),
    Audio(AudioCodecConfig),
}

/// Configuration for a recording session.
#[derive(Debug, Clone)]
pub struct RecorderConfiguration {
    /// Where the finished container is written. An existing file is replaced.
    pub output_path: PathBuf,

    pub video: VideoCodecConfig,

    pub audio: AudioCodecConfig,

    /// Maximum encoded frame rate (default: 25). Frames arriving sooner than
    /// `1 / max_frame_rate` after the last accepted frame are dropped.
    pub max_frame_rate: f64,

    /// Fail `start` when the microphone is unavailable or denied (default: true).
    /// When false the session records video only.
    pub require_audio: bool,

    /// Write a `.metadata.json` sidecar next to the finished file (default: false).
    pub write_metadata: bool,
}

impl RecorderConfiguration {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            ..Default::default()
        }
    }

    /// Minimum arrival-time gap between two accepted frames.
    pub fn min_frame_interval(&self) -> MediaTime {
        MediaTime::from_secs_f64(1.0 / self.max_frame_rate)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.output_path.as_os_str().is_empty() {
            return Err("output path must not be empty".into());
        }
        if !(self.max_frame_rate > 0.0 && self.max_frame_rate.is_finite()) {
            return Err(format!("invalid max frame rate: {}", self.max_frame_rate));
        }
        if self.video.width == 0 || self.video.height == 0 {
            return Err(format!(
                "invalid video dimensions: {}x{}",
                self.video.width, self.video.height
            ));
        }
        if self.video.pixel_format != PixelFormat::Argb8 {
            return Err(format!("unsupported encoder pixel format: {:?}", self.video.pixel_format));
        }
        if ![1, 2].contains(&self.audio.channels) {
            return Err(format!("unsupported channel count: {}", self.audio.channels));
        }
        if !AudioChunk::SAMPLE_RATE_RANGE.contains(&self.audio.sample_rate) {
            return Err(format!("unsupported sample rate: {} Hz", self.audio.sample_rate));
        }
        Ok(())
    }
}

impl Default for RecorderConfiguration {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("recording.avmx"),
            video: VideoCodecConfig::default(),
            audio: AudioCodecConfig::default(),
            max_frame_rate: 25.0,
            require_audio: true,
            write_metadata: false,
        }
    }
}
