use std::sync::Arc;

use crate::models::error::RecordError;
use crate::models::media::AudioChunk;
use crate::models::state::MicrophonePermission;

/// Callback invoked when a microphone buffer is available.
///
/// Fires on the provider's capture thread, concurrently with video ingest.
pub type AudioChunkCallback = Arc<dyn Fn(AudioChunk) + Send + Sync + 'static>;

/// Interface for platform microphone capture stacks.
///
/// Timestamps on delivered chunks must come from the same monotonic clock
/// the renderer uses for frame capture timestamps.
pub trait AudioCaptureProvider: Send {
    /// Whether a capture device is present.
    fn is_available(&self) -> bool;

    /// Current authorization without prompting.
    fn permission(&self) -> MicrophonePermission;

    /// Prompt for authorization if undetermined and return the outcome.
    fn request_permission(&mut self) -> MicrophonePermission;

    /// Start capturing, delivering buffers via `callback`.
    fn start(&mut self, callback: AudioChunkCallback) -> Result<(), RecordError>;

    /// Stop capturing and release resources. No callback fires after this returns.
    fn stop(&mut self) -> Result<(), RecordError>;
}

/// Provider for video-only recorders.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAudioCapture;

impl AudioCaptureProvider for NoAudioCapture {
    fn is_available(&self) -> bool {
        false
    }

    fn permission(&self) -> MicrophonePermission {
        MicrophonePermission::Denied
    }

    fn request_permission(&mut self) -> MicrophonePermission {
        MicrophonePermission::Denied
    }

    fn start(&mut self, _callback: AudioChunkCallback) -> Result<(), RecordError> {
        Err(RecordError::AudioCapture("no audio capture device".into()))
    }

    fn stop(&mut self) -> Result<(), RecordError> {
        Ok(())
    }
}
