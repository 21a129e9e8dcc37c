use crate::models::error::RecordError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::RecorderState;

/// Event delegate for recorder notifications.
///
/// Methods are called from whichever thread drove the change: the caller of
/// `start`/`stop`, an ingest thread, or the finalize thread.
/// Implementations should marshal to the UI thread if needed.
pub trait RecorderDelegate: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: RecorderState);

    /// Called for errors that do not end the session, and for finalization failures.
    fn on_error(&self, error: &RecordError);

    /// Called once the container is finalized and handed to storage.
    fn on_recording_finished(&self, result: &RecordingResult);
}
