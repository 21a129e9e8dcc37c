//! Byte layout of the interleaved container written by `ContainerFileWriter`.
//!
//! ```text
//! header (24 bytes)
//! [0-3]    "AVMX"
//! [4-5]    version
//! [6-7]    track count
//! [8-15]   duration in ns (placeholder, patched on finalize)
//! [16-23]  sample count (placeholder, patched on finalize)
//!
//! track record (17 bytes each, `track count` of them)
//! [0]      track kind (0 = video, 1 = audio)
//! [1-4]    codec fourcc
//! [5-16]   three u32 codec parameters
//!          video: width, height, pixel format
//!          audio: channels, sample rate, bit rate
//!
//! sample record (14-byte header + payload, until end of file)
//! [0]      track kind
//! [1]      reserved
//! [2-9]    presentation time in ns (i64)
//! [10-13]  payload length
//! ```
//!
//! All integers are little-endian.

use crate::models::config::{AudioCodec, AudioCodecConfig, CodecConfig, VideoCodec, VideoCodecConfig};
use crate::models::error::WriteError;
use crate::models::media::{MediaTime, PixelFormat, TrackKind};

pub const MAGIC: &[u8; 4] = b"AVMX";
pub const FORMAT_VERSION: u16 = 1;
pub const HEADER_SIZE: usize = 24;
pub const TRACK_RECORD_SIZE: usize = 17;
pub const SAMPLE_HEADER_SIZE: usize = 14;

const DURATION_OFFSET: usize = 8;
const SAMPLE_COUNT_OFFSET: usize = 16;

/// Generate the fixed-size container header.
pub fn generate_header(track_count: u16, duration: MediaTime, sample_count: u64) -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    header[0..4].copy_from_slice(MAGIC);
    header[4..6].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
    header[6..8].copy_from_slice(&track_count.to_le_bytes());
    patch_duration(&mut header, duration);
    patch_sample_count(&mut header, sample_count);
    header
}

/// File offset and bytes for the duration field.
pub fn duration_field(duration: MediaTime) -> (u64, [u8; 8]) {
    (DURATION_OFFSET as u64, duration.as_nanos().to_le_bytes())
}

/// File offset and bytes for the sample-count field.
pub fn sample_count_field(sample_count: u64) -> (u64, [u8; 8]) {
    (SAMPLE_COUNT_OFFSET as u64, sample_count.to_le_bytes())
}

pub fn patch_duration(header: &mut [u8], duration: MediaTime) {
    let (offset, bytes) = duration_field(duration);
    let offset = offset as usize;
    header[offset..offset + 8].copy_from_slice(&bytes);
}

pub fn patch_sample_count(header: &mut [u8], sample_count: u64) {
    let (offset, bytes) = sample_count_field(sample_count);
    let offset = offset as usize;
    header[offset..offset + 8].copy_from_slice(&bytes);
}

fn pixel_format_code(format: PixelFormat) -> u32 {
    match format {
        PixelFormat::Rgba8 => 1,
        PixelFormat::Bgra8 => 2,
        PixelFormat::Argb8 => 3,
    }
}

fn pixel_format_from_code(code: u32) -> Option<PixelFormat> {
    match code {
        1 => Some(PixelFormat::Rgba8),
        2 => Some(PixelFormat::Bgra8),
        3 => Some(PixelFormat::Argb8),
        _ => None,
    }
}

/// Encode the descriptor of one track.
pub fn encode_track(codec: &CodecConfig) -> [u8; TRACK_RECORD_SIZE] {
    let (kind, fourcc, params) = match codec {
        CodecConfig::Video(v) => (
            TrackKind::Video,
            v.codec.fourcc(),
            [v.width, v.height, pixel_format_code(v.pixel_format)],
        ),
        CodecConfig::Audio(a) => (
            TrackKind::Audio,
            a.codec.fourcc(),
            [a.channels as u32, a.sample_rate.round() as u32, a.bit_rate],
        ),
    };

    let mut record = [0u8; TRACK_RECORD_SIZE];
    record[0] = kind.tag();
    record[1..5].copy_from_slice(&fourcc);
    for (i, param) in params.iter().enumerate() {
        let start = 5 + i * 4;
        record[start..start + 4].copy_from_slice(&param.to_le_bytes());
    }
    record
}

/// Decode a track descriptor written by [`encode_track`].
pub fn decode_track(record: &[u8]) -> Result<CodecConfig, WriteError> {
    if record.len() < TRACK_RECORD_SIZE {
        return Err(WriteError::Io("truncated track record".into()));
    }
    let kind = TrackKind::from_tag(record[0])
        .ok_or_else(|| WriteError::Io(format!("unknown track kind {}", record[0])))?;
    let fourcc = [record[1], record[2], record[3], record[4]];
    let param = |i: usize| read_u32(&record[5 + i * 4..]);

    match kind {
        TrackKind::Video => {
            let codec = VideoCodec::from_fourcc(fourcc)
                .ok_or_else(|| WriteError::UnsupportedCodec(String::from_utf8_lossy(&fourcc).into_owned()))?;
            let pixel_format = pixel_format_from_code(param(2))
                .ok_or_else(|| WriteError::Io(format!("unknown pixel format {}", param(2))))?;
            Ok(CodecConfig::Video(VideoCodecConfig {
                codec,
                width: param(0),
                height: param(1),
                pixel_format,
            }))
        }
        TrackKind::Audio => {
            let codec = AudioCodec::from_fourcc(fourcc)
                .ok_or_else(|| WriteError::UnsupportedCodec(String::from_utf8_lossy(&fourcc).into_owned()))?;
            Ok(CodecConfig::Audio(AudioCodecConfig {
                codec,
                channels: param(0) as u16,
                sample_rate: param(1) as f64,
                bit_rate: param(2),
            }))
        }
    }
}

/// Encode the header preceding one sample payload.
pub fn encode_sample_header(kind: TrackKind, presentation_time: MediaTime, payload_len: u32) -> [u8; SAMPLE_HEADER_SIZE] {
    let mut header = [0u8; SAMPLE_HEADER_SIZE];
    header[0] = kind.tag();
    header[2..10].copy_from_slice(&presentation_time.as_nanos().to_le_bytes());
    header[10..14].copy_from_slice(&payload_len.to_le_bytes());
    header
}

/// One sample as found in a container file.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    pub kind: TrackKind,
    pub presentation_time: MediaTime,
    pub payload: Vec<u8>,
}

/// Parsed contents of a container file.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerContents {
    pub version: u16,
    pub duration: MediaTime,
    pub sample_count: u64,
    pub tracks: Vec<CodecConfig>,
    pub samples: Vec<SampleRecord>,
}

impl ContainerContents {
    pub fn samples_of(&self, kind: TrackKind) -> impl Iterator<Item = &SampleRecord> {
        self.samples.iter().filter(move |s| s.kind == kind)
    }
}

/// Parse a complete container image.
pub fn parse_container(data: &[u8]) -> Result<ContainerContents, WriteError> {
    if data.len() < HEADER_SIZE || &data[0..4] != MAGIC {
        return Err(WriteError::Io("not an AVMX container".into()));
    }
    let version = u16::from_le_bytes([data[4], data[5]]);
    if version != FORMAT_VERSION {
        return Err(WriteError::Io(format!("unsupported container version {}", version)));
    }
    let track_count = u16::from_le_bytes([data[6], data[7]]) as usize;
    let duration = MediaTime::from_nanos(read_i64(&data[DURATION_OFFSET..]));
    let sample_count = read_u64(&data[SAMPLE_COUNT_OFFSET..]);

    let mut offset = HEADER_SIZE;
    let mut tracks = Vec::with_capacity(track_count);
    for _ in 0..track_count {
        let end = offset + TRACK_RECORD_SIZE;
        if end > data.len() {
            return Err(WriteError::Io("truncated track table".into()));
        }
        tracks.push(decode_track(&data[offset..end])?);
        offset = end;
    }

    let mut samples = Vec::new();
    while offset < data.len() {
        if offset + SAMPLE_HEADER_SIZE > data.len() {
            return Err(WriteError::Io("truncated sample header".into()));
        }
        let header = &data[offset..offset + SAMPLE_HEADER_SIZE];
        let kind = TrackKind::from_tag(header[0])
            .ok_or_else(|| WriteError::Io(format!("unknown track kind {}", header[0])))?;
        let presentation_time = MediaTime::from_nanos(read_i64(&header[2..]));
        let len = read_u32(&header[10..]) as usize;
        let start = offset + SAMPLE_HEADER_SIZE;
        if start + len > data.len() {
            return Err(WriteError::Io("truncated sample payload".into()));
        }
        samples.push(SampleRecord {
            kind,
            presentation_time,
            payload: data[start..start + len].to_vec(),
        });
        offset = start + len;
    }

    Ok(ContainerContents {
        version,
        duration,
        sample_count,
        tracks,
        samples,
    })
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

fn read_i64(bytes: &[u8]) -> i64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    i64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let header = generate_header(2, MediaTime::from_millis(1500), 42);
        assert_eq!(header.len(), 24);
        assert_eq!(&header[0..4], b"AVMX");
        assert_eq!(u16::from_le_bytes([header[4], header[5]]), FORMAT_VERSION);
        assert_eq!(u16::from_le_bytes([header[6], header[7]]), 2);
        assert_eq!(read_i64(&header[8..]), 1_500_000_000);
        assert_eq!(read_u64(&header[16..]), 42);
    }

    #[test]
    fn patch_fields() {
        let mut header = generate_header(1, MediaTime::ZERO, 0);
        patch_duration(&mut header, MediaTime::from_millis(90));
        patch_sample_count(&mut header, 3);
        assert_eq!(read_i64(&header[8..]), 90_000_000);
        assert_eq!(read_u64(&header[16..]), 3);
    }

    #[test]
    fn video_track_record() {
        let codec = CodecConfig::Video(VideoCodecConfig {
            width: 640,
            height: 480,
            ..Default::default()
        });
        let record = encode_track(&codec);
        assert_eq!(record[0], 0);
        assert_eq!(&record[1..5], b"avc1");
        assert_eq!(read_u32(&record[5..]), 640);
        assert_eq!(read_u32(&record[9..]), 480);
        assert_eq!(decode_track(&record).unwrap(), codec);
    }

    #[test]
    fn audio_track_record() {
        let codec = CodecConfig::Audio(AudioCodecConfig::default());
        let record = encode_track(&codec);
        assert_eq!(record[0], 1);
        assert_eq!(&record[1..5], b"mp4a");
        assert_eq!(read_u32(&record[5..]), 2);
        assert_eq!(read_u32(&record[9..]), 44100);
        assert_eq!(read_u32(&record[13..]), 192_000);
    }

    #[test]
    fn parses_hand_built_container() {
        let mut data = generate_header(1, MediaTime::from_millis(45), 2).to_vec();
        data.extend_from_slice(&encode_track(&CodecConfig::Audio(AudioCodecConfig::default())));
        data.extend_from_slice(&encode_sample_header(TrackKind::Audio, MediaTime::ZERO, 2));
        data.extend_from_slice(&[1, 2]);
        data.extend_from_slice(&encode_sample_header(TrackKind::Audio, MediaTime::from_millis(45), 0));

        let contents = parse_container(&data).unwrap();
        assert_eq!(contents.tracks.len(), 1);
        assert_eq!(contents.sample_count, 2);
        assert_eq!(contents.samples.len(), 2);
        assert_eq!(contents.samples[0].payload, vec![1, 2]);
        assert_eq!(contents.samples[1].presentation_time, MediaTime::from_millis(45));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_container(b"RIFF0000WAVE").is_err());
        let mut data = generate_header(0, MediaTime::ZERO, 1).to_vec();
        data.extend_from_slice(&encode_sample_header(TrackKind::Video, MediaTime::ZERO, 100));
        assert!(parse_container(&data).is_err());
    }
}
