use thiserror::Error;

use super::media::{MediaTime, TrackKind};

/// Errors reported by a container writer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WriteError {
    /// The track's encoder buffer is full; the sample should be dropped.
    #[error("{0} track is not ready for more data")]
    NotReady(TrackKind),

    /// Append before writing started or after the track was marked finished.
    #[error("{0} track is not accepting data")]
    NotWriting(TrackKind),

    #[error("{0} track was never added")]
    UnknownTrack(TrackKind),

    #[error("{kind} sample at {presentation_time} precedes previous sample at {previous}")]
    OutOfOrder {
        kind: TrackKind,
        presentation_time: MediaTime,
        previous: MediaTime,
    },

    /// The sample's own format cannot be written (zero channels, bogus rate).
    #[error("malformed {kind} sample: {reason}")]
    MalformedSample { kind: TrackKind, reason: String },

    #[error("invalid writer state: {0}")]
    InvalidState(String),

    #[error("unsupported codec configuration: {0}")]
    UnsupportedCodec(String),

    #[error("i/o error: {0}")]
    Io(String),
}

/// Errors that can occur during a recording session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("failed to initialize container writer: {0}")]
    WriterInit(String),

    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("invalid recorder state: {0}")]
    InvalidState(String),

    #[error("configuration failed: {0}")]
    Configuration(String),

    #[error("pixel conversion failed: {0}")]
    PixelConversion(String),

    #[error("audio capture failed: {0}")]
    AudioCapture(String),

    #[error("write failed: {0}")]
    Write(#[from] WriteError),

    #[error("finalization failed: {0}")]
    Finalization(String),

    #[error("storage error: {0}")]
    Storage(String),
}
