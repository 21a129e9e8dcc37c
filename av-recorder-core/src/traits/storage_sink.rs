use std::path::Path;

use crate::models::error::RecordError;
use crate::models::recording_result::RecordingMetadata;

/// Downstream destination for finished recordings.
///
/// Receives a file only after its container finalized without error.
pub trait StorageSink: Send + Sync {
    fn store(&self, file_path: &Path, metadata: &RecordingMetadata) -> Result<(), RecordError>;
}
