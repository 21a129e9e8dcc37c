use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::models::error::RecordError;
use crate::models::recording_result::RecordingMetadata;
use crate::traits::storage_sink::StorageSink;

use super::metadata::write_metadata;

/// Directory-backed media library.
///
/// Finished recordings are copied in under their metadata id, with the
/// metadata written as a sidecar next to each copy.
pub struct MediaLibrary {
    root: PathBuf,
    stored: Mutex<Vec<PathBuf>>,
}

impl MediaLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            stored: Mutex::new(Vec::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Paths of every recording stored through this library instance.
    pub fn stored(&self) -> Vec<PathBuf> {
        self.stored.lock().clone()
    }
}

impl StorageSink for MediaLibrary {
    fn store(&self, file_path: &Path, metadata: &RecordingMetadata) -> Result<(), RecordError> {
        fs::create_dir_all(&self.root)
            .map_err(|e| RecordError::Storage(format!("failed to create library directory: {}", e)))?;

        let extension = file_path.extension().and_then(|e| e.to_str()).unwrap_or("avmx");
        let target = self.root.join(format!("{}.{}", metadata.id, extension));
        fs::copy(file_path, &target).map_err(|e| {
            RecordError::Storage(format!("failed to copy {} into library: {}", file_path.display(), e))
        })?;
        write_metadata(metadata, &target)?;

        log::info!("Saved recording {} to {}", metadata.id, target.display());
        self.stored.lock().push(target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::media::MediaTime;
    use crate::models::recording_result::FinalizedContainer;
    use crate::storage::metadata::read_metadata;

    #[test]
    fn copies_recording_with_sidecar() {
        let base = std::env::temp_dir().join(format!("av_recorder_library_{}", std::process::id()));
        let source = base.join("source.avmx");
        fs::create_dir_all(&base).unwrap();
        fs::write(&source, b"AVMX-test").unwrap();

        let finalized = FinalizedContainer {
            file_path: source.clone(),
            duration: MediaTime::from_millis(100),
            checksum: "00".into(),
            video_samples: 1,
            audio_samples: 1,
        };
        let metadata = RecordingMetadata::new(&finalized, Vec::new(), 0, 0);

        let library = MediaLibrary::new(base.join("library"));
        library.store(&source, &metadata).unwrap();

        let stored = library.stored();
        assert_eq!(stored.len(), 1);
        assert_eq!(fs::read(&stored[0]).unwrap(), b"AVMX-test");
        assert_eq!(read_metadata(&stored[0]).unwrap().id, metadata.id);

        fs::remove_dir_all(&base).ok();
    }

    #[test]
    fn missing_source_is_a_storage_error() {
        let library = MediaLibrary::new(std::env::temp_dir().join("av_recorder_library_missing"));
        let finalized = FinalizedContainer {
            file_path: PathBuf::from("/nonexistent/recording.avmx"),
            duration: MediaTime::ZERO,
            checksum: String::new(),
            video_samples: 0,
            audio_samples: 0,
        };
        let metadata = RecordingMetadata::new(&finalized, Vec::new(), 0, 0);
        let err = library.store(&finalized.file_path, &metadata).unwrap_err();
        assert!(matches!(err, RecordError::Storage(_)));
    }
}
