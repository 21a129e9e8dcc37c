use std::path::Path;

use crate::models::config::{CodecConfig, RecorderConfiguration};
use crate::models::error::WriteError;
use crate::models::media::{MediaTime, SampleData, TrackKind};
use crate::models::recording_result::FinalizedContainer;

/// Fired exactly once when finalization completes. `Ok` is the only signal
/// that the output file is safe to hand to storage.
pub type FinalizeCompletion = Box<dyn FnOnce(Result<FinalizedContainer, WriteError>) + Send + 'static>;

/// Muxing container writer with one video and one audio track.
///
/// Lifecycle:
/// ```text
/// add_track* → start_writing → (is_ready / append)* → mark_finished* → finalize
/// ```
///
/// Presentation times appended to a track must be non-decreasing. `append`
/// fails with `NotWriting` before `start_writing` and after `mark_finished`
/// for that track.
pub trait ContainerWriter: Send {
    fn add_track(&mut self, kind: TrackKind, codec: CodecConfig) -> Result<(), WriteError>;

    /// Enter the writing state. Tracks can no longer be added.
    fn start_writing(&mut self) -> Result<(), WriteError>;

    /// Whether the track can take another sample without blocking.
    fn is_ready(&self, kind: TrackKind) -> bool;

    fn append(
        &mut self,
        kind: TrackKind,
        sample: SampleData<'_>,
        presentation_time: MediaTime,
    ) -> Result<(), WriteError>;

    /// Signal that no more samples will be appended to the track.
    fn mark_finished(&mut self, kind: TrackKind);

    /// Close the container. `completion` may fire on another thread.
    fn finalize(self: Box<Self>, completion: FinalizeCompletion);
}

/// Creates one writer per recording session.
pub trait ContainerWriterFactory: Send + Sync {
    fn create(&self, output_path: &Path, config: &RecorderConfiguration)
        -> Result<Box<dyn ContainerWriter>, WriteError>;
}
