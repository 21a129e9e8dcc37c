//! # av-recorder-core
//!
//! Platform-agnostic synchronized audio/video recording core.
//!
//! Takes rendered frames from a renderer and microphone buffers from an
//! audio capture stack, aligns both onto one timeline anchored at the first
//! accepted frame, and muxes them into a single container file. Platform
//! pieces (clock, microphone, encoder/container, media library) plug in
//! through the traits in [`traits`].
//!
//! ## Architecture
//!
//! ```text
//! av-recorder-core (this crate)
//! ├── traits/       ← Clock, ContainerWriter(+Factory), AudioCaptureProvider, PixelConverter,
//! │                   RecorderDelegate, StorageSink
//! ├── models/       ← RecordError, WriteError, RecorderState, RecorderConfiguration, media types
//! ├── processing/   ← FrameThrottle, audio retiming, ARGB conversion, PCM formatting, AVMX layout
//! ├── session/      ← SynchronizedRecorder (session controller + both ingest paths)
//! └── storage/      ← ContainerFileWriter, metadata sidecar, MediaLibrary
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::config::{AudioCodec, AudioCodecConfig, CodecConfig, RecorderConfiguration, VideoCodec, VideoCodecConfig};
pub use models::error::{RecordError, WriteError};
pub use models::media::{
    AudioChunk, MediaTime, PixelBuffer, PixelFormat, RecorderDiagnostics, SampleData, SampleTiming, TrackKind,
    VideoFrame, VideoImage,
};
pub use models::recording_result::{FinalizedContainer, RecordingMetadata, RecordingResult, TrackDescriptor};
pub use models::state::{AudioOutcome, FrameOutcome, MicrophonePermission, RecorderState};
pub use processing::frame_throttle::FrameThrottle;
pub use processing::pixel_conversion::ArgbConverter;
pub use session::finalize::FinalizeHandle;
pub use session::recorder::{RecorderBuilder, SynchronizedRecorder};
pub use storage::container_file::{read_container, ContainerFileWriter, ContainerFileWriterFactory};
pub use storage::library::MediaLibrary;
pub use traits::audio_provider::{AudioCaptureProvider, AudioChunkCallback, NoAudioCapture};
pub use traits::clock::{Clock, ManualClock, MonotonicClock};
pub use traits::container_writer::{ContainerWriter, ContainerWriterFactory, FinalizeCompletion};
pub use traits::pixel_converter::PixelConverter;
pub use traits::recorder_delegate::RecorderDelegate;
pub use traits::storage_sink::StorageSink;
