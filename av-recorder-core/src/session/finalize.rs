use std::sync::mpsc;
use std::sync::Arc;

use crate::models::config::{CodecConfig, RecorderConfiguration};
use crate::models::error::RecordError;
use crate::models::media::{RecorderDiagnostics, TrackKind};
use crate::models::recording_result::{FinalizedContainer, RecordingMetadata, RecordingResult, TrackDescriptor};
use crate::storage::metadata::write_metadata;
use crate::traits::container_writer::ContainerWriter;
use crate::traits::recorder_delegate::RecorderDelegate;
use crate::traits::storage_sink::StorageSink;

/// Waits for the outcome of a `stop`.
///
/// The recording has been handed to storage (if one is configured) by the
/// time a successful result is available.
pub struct FinalizeHandle {
    rx: mpsc::Receiver<Result<RecordingResult, RecordError>>,
}

impl FinalizeHandle {
    pub(crate) fn new(rx: mpsc::Receiver<Result<RecordingResult, RecordError>>) -> Self {
        Self { rx }
    }

    /// Block until finalization completes.
    pub fn wait(self) -> Result<RecordingResult, RecordError> {
        self.rx
            .recv()
            .unwrap_or_else(|_| Err(RecordError::Finalization("finalize thread exited without a result".into())))
    }

    /// Non-blocking check; `None` while finalization is still running.
    pub fn try_result(&self) -> Option<Result<RecordingResult, RecordError>> {
        self.rx.try_recv().ok()
    }
}

/// Everything the finalize thread needs from the session it closes.
pub(crate) struct FinalizeContext {
    pub config: RecorderConfiguration,
    pub has_audio_track: bool,
    pub diagnostics: RecorderDiagnostics,
    pub storage: Option<Arc<dyn StorageSink>>,
    pub delegate: Option<Arc<dyn RecorderDelegate>>,
}

/// Close the container, then describe and store the result.
pub(crate) fn finalize_session(
    writer: Box<dyn ContainerWriter>,
    context: &FinalizeContext,
) -> Result<RecordingResult, RecordError> {
    let finalized = close_writer(writer)?;

    let mut tracks = vec![TrackDescriptor {
        kind: TrackKind::Video,
        codec: CodecConfig::Video(context.config.video.clone()),
        sample_count: finalized.video_samples,
    }];
    if context.has_audio_track {
        tracks.push(TrackDescriptor {
            kind: TrackKind::Audio,
            codec: CodecConfig::Audio(context.config.audio.clone()),
            sample_count: finalized.audio_samples,
        });
    }

    let d = &context.diagnostics;
    let frames_dropped = d.frames_dropped_not_ready + d.frames_dropped_out_of_order + d.conversion_failures;
    let audio_dropped = d.audio_dropped_no_zero_point
        + d.audio_dropped_not_ready
        + d.audio_dropped_out_of_order
        + d.audio_dropped_malformed;
    let metadata = RecordingMetadata::new(&finalized, tracks, frames_dropped, audio_dropped);

    if context.config.write_metadata {
        if let Err(e) = write_metadata(&metadata, &finalized.file_path) {
            log::warn!("Recording finalized but metadata sidecar failed: {}", e);
            notify_error(context, &e);
        }
    }

    // A storage failure leaves a valid file at the output path.
    if let Some(ref storage) = context.storage {
        if let Err(e) = storage.store(&finalized.file_path, &metadata) {
            log::error!("Failed to hand {} to storage: {}", finalized.file_path.display(), e);
            notify_error(context, &e);
        }
    }

    log::info!(
        "Recording finalized: {} ({:.2}s, {} video / {} audio samples)",
        finalized.file_path.display(),
        finalized.duration.as_secs_f64(),
        finalized.video_samples,
        finalized.audio_samples
    );

    Ok(RecordingResult {
        file_path: finalized.file_path.clone(),
        duration_secs: finalized.duration.as_secs_f64(),
        checksum: finalized.checksum.clone(),
        metadata,
    })
}

/// Run the writer's asynchronous finalize and wait for its completion.
fn close_writer(writer: Box<dyn ContainerWriter>) -> Result<FinalizedContainer, RecordError> {
    let (tx, rx) = mpsc::channel();
    writer.finalize(Box::new(move |result| {
        tx.send(result).ok();
    }));
    match rx.recv() {
        Ok(result) => result.map_err(|e| RecordError::Finalization(e.to_string())),
        Err(_) => Err(RecordError::Finalization(
            "writer dropped its completion without reporting".into(),
        )),
    }
}

fn notify_error(context: &FinalizeContext, error: &RecordError) {
    if let Some(ref delegate) = context.delegate {
        delegate.on_error(error);
    }
}
