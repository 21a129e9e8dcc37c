use std::fmt;
use std::ops::{Add, RangeInclusive, Sub};

use serde::{Deserialize, Serialize};

/// A point (or span) on a monotonic media clock, in nanoseconds.
///
/// Capture timestamps, wall-clock arrival times and session-relative
/// presentation times all share this representation. Values may be negative:
/// a sample captured before the session zero point yields a negative offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct MediaTime(i64);

impl MediaTime {
    pub const ZERO: MediaTime = MediaTime(0);

    const NANOS_PER_SEC: i64 = 1_000_000_000;

    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub const fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs * Self::NANOS_PER_SEC as f64).round() as i64)
    }

    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    pub const fn as_millis(self) -> i64 {
        self.0 / 1_000_000
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / Self::NANOS_PER_SEC as f64
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl Sub for MediaTime {
    type Output = MediaTime;

    fn sub(self, rhs: MediaTime) -> MediaTime {
        MediaTime(self.0.saturating_sub(rhs.0))
    }
}

impl Add for MediaTime {
    type Output = MediaTime;

    fn add(self, rhs: MediaTime) -> MediaTime {
        MediaTime(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

/// Which track of the output container a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

impl TrackKind {
    /// Byte tag used by the container format.
    pub fn tag(self) -> u8 {
        match self {
            Self::Video => 0,
            Self::Audio => 1,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Video),
            1 => Some(Self::Audio),
            _ => None,
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => f.write_str("video"),
            Self::Audio => f.write_str("audio"),
        }
    }
}

/// Memory layout of 8-bit, 4-channel pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgba8,
    Bgra8,
    /// 32-bit ARGB, the layout the video encoder consumes.
    Argb8,
}

impl PixelFormat {
    pub const BYTES_PER_PIXEL: usize = 4;
}

/// A rendered still image as produced by the renderer on a display tick.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl VideoImage {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// A uniformly filled image, handy for renderers that have nothing to draw yet.
    pub fn solid(width: u32, height: u32, format: PixelFormat, pixel: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * PixelFormat::BYTES_PER_PIXEL);
        for _ in 0..count {
            data.extend_from_slice(&pixel);
        }
        Self::new(width, height, format, data)
    }

    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * PixelFormat::BYTES_PER_PIXEL
    }
}

/// One rendered image plus the capture-time timestamp from the shared clock.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub image: VideoImage,
    pub capture_timestamp: MediaTime,
}

/// Encoder-ready pixel data.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub bytes_per_row: usize,
    pub data: Vec<u8>,
}

/// Timing entry carried by an audio buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleTiming {
    pub duration: MediaTime,
    pub presentation: MediaTime,
    pub decode: MediaTime,
}

/// One buffer of microphone samples with its hardware timestamp.
///
/// `samples` are interleaved f32 in `[-1.0, 1.0]`. A buffer may carry several
/// timing entries.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: f64,
    pub hardware_timestamp: MediaTime,
    pub timing: Vec<SampleTiming>,
}

impl AudioChunk {
    /// A chunk with a single timing entry spanning all of its frames.
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: f64, hardware_timestamp: MediaTime) -> Self {
        let frames = if channels == 0 { 0 } else { samples.len() / channels as usize };
        let duration = if sample_rate > 0.0 {
            MediaTime::from_secs_f64(frames as f64 / sample_rate)
        } else {
            MediaTime::ZERO
        };
        Self {
            samples,
            channels,
            sample_rate,
            hardware_timestamp,
            timing: vec![SampleTiming {
                duration,
                presentation: hardware_timestamp,
                decode: hardware_timestamp,
            }],
        }
    }

    /// Rates a capture stack can plausibly deliver. Anything outside cannot
    /// be resampled onto the audio track.
    pub const SAMPLE_RATE_RANGE: RangeInclusive<f64> = 1_000.0..=768_000.0;

    /// Check that the chunk describes a format the writer can conform.
    pub fn validate(&self) -> Result<(), String> {
        if self.channels == 0 {
            return Err("audio chunk has zero channels".into());
        }
        if !Self::SAMPLE_RATE_RANGE.contains(&self.sample_rate) {
            return Err(format!("audio chunk sample rate {} Hz is out of range", self.sample_rate));
        }
        Ok(())
    }

    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }
}

/// Payload handed to a container writer for one append.
#[derive(Debug, Clone, Copy)]
pub enum SampleData<'a> {
    Video(&'a PixelBuffer),
    Audio(&'a AudioChunk),
}

impl SampleData<'_> {
    pub fn kind(&self) -> TrackKind {
        match self {
            Self::Video(_) => TrackKind::Video,
            Self::Audio(_) => TrackKind::Audio,
        }
    }
}

/// Counters describing what happened to every offered frame and chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecorderDiagnostics {
    pub frames_offered: u64,
    pub frames_accepted: u64,
    pub frames_throttled: u64,
    pub frames_written: u64,
    pub frames_dropped_not_ready: u64,
    pub frames_dropped_out_of_order: u64,
    pub conversion_failures: u64,
    pub audio_chunks_offered: u64,
    pub audio_chunks_written: u64,
    pub audio_dropped_no_zero_point: u64,
    pub audio_dropped_not_ready: u64,
    pub audio_dropped_out_of_order: u64,
    pub audio_dropped_malformed: u64,
    pub write_failures: u64,
}
