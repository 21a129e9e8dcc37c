use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::config::CodecConfig;
use super::media::{MediaTime, TrackKind};

/// What a container writer reports once finalization completes.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedContainer {
    pub file_path: PathBuf,
    pub duration: MediaTime,
    pub checksum: String,
    pub video_samples: u64,
    pub audio_samples: u64,
}

/// Result returned when a recording session completes successfully.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    pub duration_secs: f64,
    pub metadata: RecordingMetadata,
    pub checksum: String,
}

/// One track as listed in the metadata sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub kind: TrackKind,
    pub codec: CodecConfig,
    pub sample_count: u64,
}

/// Metadata stored alongside a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub duration_secs: f64,
    pub file_path: String,
    pub checksum: String,
    pub created_at: String,
    pub tracks: Vec<TrackDescriptor>,
    pub frames_dropped: u64,
    pub audio_chunks_dropped: u64,
}

impl RecordingMetadata {
    pub fn new(
        finalized: &FinalizedContainer,
        tracks: Vec<TrackDescriptor>,
        frames_dropped: u64,
        audio_chunks_dropped: u64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            duration_secs: finalized.duration.as_secs_f64(),
            file_path: finalized.file_path.to_string_lossy().into_owned(),
            checksum: finalized.checksum.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
            tracks,
            frames_dropped,
            audio_chunks_dropped,
        }
    }

    pub fn track(&self, kind: TrackKind) -> Option<&TrackDescriptor> {
        self.tracks.iter().find(|t| t.kind == kind)
    }
}
