use std::fs::{self, File};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::config::{CodecConfig, RecorderConfiguration};
use crate::models::error::WriteError;
use crate::models::media::{MediaTime, SampleData, TrackKind};
use crate::models::recording_result::FinalizedContainer;
use crate::processing::container_format::{self, ContainerContents};
use crate::processing::pcm::PcmFormatter;
use crate::traits::container_writer::{ContainerWriter, ContainerWriterFactory, FinalizeCompletion};

struct TrackSlot {
    kind: TrackKind,
    codec: CodecConfig,
    finished: bool,
    last_time: Option<MediaTime>,
    samples: u64,
}

/// Streaming writer for the interleaved AVMX container.
///
/// Samples are written to `<output>.part` as they arrive. Finalize patches
/// the header, renames the file into place and computes a SHA-256 checksum.
/// A writer dropped without a successful finalize deletes its partial file.
///
/// ## File Format
///
/// ```text
/// [24-byte header, duration and sample count patched on finalize]
/// [track table]
/// [sample 1: 14-byte header | payload]
/// [sample 2: ...]
/// ```
pub struct ContainerFileWriter {
    output_path: PathBuf,
    partial_path: PathBuf,
    file: Option<BufWriter<File>>,
    tracks: Vec<TrackSlot>,
    is_writing: bool,
    total_bytes_written: u64,
    end_time: MediaTime,
}

impl ContainerFileWriter {
    /// Allocate the output. Any existing file at `output_path` is removed.
    pub fn create(output_path: PathBuf) -> Result<Self, WriteError> {
        match fs::remove_file(&output_path) {
            Ok(()) => log::info!("Removed existing recording at {}", output_path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(WriteError::Io(format!(
                    "failed to remove existing file {}: {}",
                    output_path.display(),
                    e
                )))
            }
        }

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| WriteError::Io(format!("failed to create directory: {}", e)))?;
        }

        let partial_path = partial_path_for(&output_path);
        let file =
            File::create(&partial_path).map_err(|e| WriteError::Io(format!("failed to create file: {}", e)))?;

        Ok(Self {
            output_path,
            partial_path,
            file: Some(BufWriter::new(file)),
            tracks: Vec::new(),
            is_writing: false,
            total_bytes_written: 0,
            end_time: MediaTime::ZERO,
        })
    }

    /// Total bytes written so far (including header and track table).
    pub fn bytes_written(&self) -> u64 {
        self.total_bytes_written
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn partial_path(&self) -> &Path {
        &self.partial_path
    }

    fn slot(&self, kind: TrackKind) -> Option<&TrackSlot> {
        self.tracks.iter().find(|t| t.kind == kind)
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), WriteError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| WriteError::InvalidState("file is not open".into()))?;
        file.write_all(data)
            .map_err(|e| WriteError::Io(format!("write failed: {}", e)))?;
        self.total_bytes_written += data.len() as u64;
        Ok(())
    }

    fn encode_payload(codec: &CodecConfig, sample: SampleData<'_>) -> Result<Vec<u8>, WriteError> {
        match (codec, sample) {
            (CodecConfig::Video(_), SampleData::Video(buffer)) => Ok(buffer.data.clone()),
            (CodecConfig::Audio(audio), SampleData::Audio(chunk)) => {
                chunk.validate().map_err(|reason| WriteError::MalformedSample {
                    kind: TrackKind::Audio,
                    reason,
                })?;
                let formatter = PcmFormatter::new(audio.sample_rate, audio.channels);
                Ok(formatter.format(&chunk.samples, chunk.channels, chunk.sample_rate))
            }
            (_, sample) => Err(WriteError::InvalidState(format!(
                "{} sample appended to mismatched track",
                sample.kind()
            ))),
        }
    }

    /// Flush, patch the header, and move the file into place.
    fn finish(&mut self) -> Result<FinalizedContainer, WriteError> {
        if !self.is_writing {
            return Err(WriteError::InvalidState("writer never started writing".into()));
        }
        let writer = self
            .file
            .take()
            .ok_or_else(|| WriteError::InvalidState("file is not open".into()))?;
        let mut file = writer
            .into_inner()
            .map_err(|e| WriteError::Io(format!("flush failed: {}", e.error())))?;

        let sample_count: u64 = self.tracks.iter().map(|t| t.samples).sum();
        for (offset, bytes) in [
            container_format::duration_field(self.end_time),
            container_format::sample_count_field(sample_count),
        ] {
            file.seek(SeekFrom::Start(offset))
                .map_err(|e| WriteError::Io(e.to_string()))?;
            file.write_all(&bytes).map_err(|e| WriteError::Io(e.to_string()))?;
        }
        file.sync_all().map_err(|e| WriteError::Io(e.to_string()))?;
        drop(file);
        self.is_writing = false;

        fs::rename(&self.partial_path, &self.output_path)
            .map_err(|e| WriteError::Io(format!("failed to move recording into place: {}", e)))?;

        let checksum = sha256_file(&self.output_path)?;
        let count_of = |kind| self.slot(kind).map(|t| t.samples).unwrap_or(0);

        Ok(FinalizedContainer {
            file_path: self.output_path.clone(),
            duration: self.end_time,
            checksum,
            video_samples: count_of(TrackKind::Video),
            audio_samples: count_of(TrackKind::Audio),
        })
    }

    fn discard_partial(&mut self) {
        self.file = None;
        match fs::remove_file(&self.partial_path) {
            Ok(()) => log::warn!("Discarded partial recording {}", self.partial_path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::error!("Failed to remove partial recording {}: {}", self.partial_path.display(), e),
        }
    }
}

impl ContainerWriter for ContainerFileWriter {
    fn add_track(&mut self, kind: TrackKind, codec: CodecConfig) -> Result<(), WriteError> {
        if self.is_writing {
            return Err(WriteError::InvalidState("cannot add tracks after writing started".into()));
        }
        let matches_kind = matches!(
            (&codec, kind),
            (CodecConfig::Video(_), TrackKind::Video) | (CodecConfig::Audio(_), TrackKind::Audio)
        );
        if !matches_kind {
            return Err(WriteError::UnsupportedCodec(format!("codec does not fit a {} track", kind)));
        }
        if self.slot(kind).is_some() {
            return Err(WriteError::InvalidState(format!("{} track already added", kind)));
        }
        self.tracks.push(TrackSlot {
            kind,
            codec,
            finished: false,
            last_time: None,
            samples: 0,
        });
        Ok(())
    }

    fn start_writing(&mut self) -> Result<(), WriteError> {
        if self.is_writing {
            return Ok(());
        }
        if self.tracks.is_empty() {
            return Err(WriteError::InvalidState("no tracks added".into()));
        }

        let header = container_format::generate_header(self.tracks.len() as u16, MediaTime::ZERO, 0);
        self.write_raw(&header)?;
        let records: Vec<_> = self.tracks.iter().map(|t| container_format::encode_track(&t.codec)).collect();
        for record in records {
            self.write_raw(&record)?;
        }
        self.is_writing = true;
        Ok(())
    }

    fn is_ready(&self, kind: TrackKind) -> bool {
        self.is_writing && self.slot(kind).is_some_and(|t| !t.finished)
    }

    fn append(
        &mut self,
        kind: TrackKind,
        sample: SampleData<'_>,
        presentation_time: MediaTime,
    ) -> Result<(), WriteError> {
        if !self.is_writing {
            return Err(WriteError::NotWriting(kind));
        }
        let index = self
            .tracks
            .iter()
            .position(|t| t.kind == kind)
            .ok_or(WriteError::UnknownTrack(kind))?;

        let slot = &self.tracks[index];
        if slot.finished {
            return Err(WriteError::NotWriting(kind));
        }
        if let Some(previous) = slot.last_time {
            if presentation_time < previous {
                return Err(WriteError::OutOfOrder {
                    kind,
                    presentation_time,
                    previous,
                });
            }
        }

        let payload = Self::encode_payload(&slot.codec, sample)?;
        let payload_len = u32::try_from(payload.len())
            .map_err(|_| WriteError::Io(format!("sample of {} bytes is too large", payload.len())))?;
        self.write_raw(&container_format::encode_sample_header(kind, presentation_time, payload_len))?;
        self.write_raw(&payload)?;

        let slot = &mut self.tracks[index];
        slot.last_time = Some(presentation_time);
        slot.samples += 1;
        self.end_time = self.end_time.max(presentation_time);
        Ok(())
    }

    fn mark_finished(&mut self, kind: TrackKind) {
        if let Some(slot) = self.tracks.iter_mut().find(|t| t.kind == kind) {
            slot.finished = true;
        }
    }

    fn finalize(mut self: Box<Self>, completion: FinalizeCompletion) {
        let result = self.finish();
        if let Err(ref e) = result {
            log::error!("Failed to finalize {}: {}", self.output_path.display(), e);
            self.discard_partial();
        }
        completion(result);
    }
}

impl Drop for ContainerFileWriter {
    fn drop(&mut self) {
        if self.file.is_some() || self.is_writing {
            self.discard_partial();
        }
    }
}

/// Creates a [`ContainerFileWriter`] at the configured output path.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContainerFileWriterFactory;

impl ContainerWriterFactory for ContainerFileWriterFactory {
    fn create(
        &self,
        output_path: &Path,
        _config: &RecorderConfiguration,
    ) -> Result<Box<dyn ContainerWriter>, WriteError> {
        Ok(Box::new(ContainerFileWriter::create(output_path.to_path_buf())?))
    }
}

/// Read and parse a finished container file.
pub fn read_container(path: &Path) -> Result<ContainerContents, WriteError> {
    let data = fs::read(path).map_err(|e| WriteError::Io(format!("failed to read {}: {}", path.display(), e)))?;
    container_format::parse_container(&data)
}

fn partial_path_for(output_path: &Path) -> PathBuf {
    let mut name = output_path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Compute SHA-256 hex digest of a file.
pub(crate) fn sha256_file(path: &Path) -> Result<String, WriteError> {
    let data = fs::read(path).map_err(|e| WriteError::Io(format!("failed to read file for checksum: {}", e)))?;
    let digest = Sha256::digest(&data);
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    use crate::models::config::{AudioCodecConfig, VideoCodecConfig};
    use crate::models::media::{AudioChunk, PixelBuffer, PixelFormat};

    fn temp_file_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("av_recorder_test_{}_{}", std::process::id(), name))
    }

    fn video_codec() -> CodecConfig {
        CodecConfig::Video(VideoCodecConfig {
            width: 2,
            height: 1,
            ..Default::default()
        })
    }

    fn audio_codec() -> CodecConfig {
        CodecConfig::Audio(AudioCodecConfig {
            channels: 1,
            sample_rate: 8000.0,
            ..Default::default()
        })
    }

    fn pixel_buffer() -> PixelBuffer {
        PixelBuffer {
            width: 2,
            height: 1,
            format: PixelFormat::Argb8,
            bytes_per_row: 8,
            data: vec![7; 8],
        }
    }

    fn finalize_blocking(writer: ContainerFileWriter) -> Result<FinalizedContainer, WriteError> {
        let (tx, rx) = mpsc::channel();
        Box::new(writer).finalize(Box::new(move |result| {
            tx.send(result).ok();
        }));
        rx.recv().unwrap()
    }

    fn started_writer(path: &Path) -> ContainerFileWriter {
        let mut writer = ContainerFileWriter::create(path.to_path_buf()).unwrap();
        writer.add_track(TrackKind::Video, video_codec()).unwrap();
        writer.add_track(TrackKind::Audio, audio_codec()).unwrap();
        writer.start_writing().unwrap();
        writer
    }

    #[test]
    fn writes_and_finalizes_container() {
        let path = temp_file_path("full.avmx");
        let mut writer = started_writer(&path);
        assert!(writer.partial_path().exists());

        let buffer = pixel_buffer();
        let chunk = AudioChunk::new(vec![0.5; 4], 1, 8000.0, MediaTime::ZERO);
        writer.append(TrackKind::Video, SampleData::Video(&buffer), MediaTime::ZERO).unwrap();
        writer.append(TrackKind::Audio, SampleData::Audio(&chunk), MediaTime::from_millis(10)).unwrap();
        writer.append(TrackKind::Video, SampleData::Video(&buffer), MediaTime::from_millis(45)).unwrap();
        writer.mark_finished(TrackKind::Video);
        writer.mark_finished(TrackKind::Audio);
        let partial = writer.partial_path().to_path_buf();

        let finalized = finalize_blocking(writer).unwrap();
        assert_eq!(finalized.file_path, path);
        assert_eq!(finalized.video_samples, 2);
        assert_eq!(finalized.audio_samples, 1);
        assert_eq!(finalized.duration, MediaTime::from_millis(45));
        assert_eq!(finalized.checksum.len(), 64);
        assert!(!partial.exists());

        let contents = read_container(&path).unwrap();
        assert_eq!(contents.tracks, vec![video_codec(), audio_codec()]);
        assert_eq!(contents.sample_count, 3);
        assert_eq!(contents.duration, MediaTime::from_millis(45));
        let video_times: Vec<_> = contents.samples_of(TrackKind::Video).map(|s| s.presentation_time).collect();
        assert_eq!(video_times, vec![MediaTime::ZERO, MediaTime::from_millis(45)]);
        let audio = contents.samples_of(TrackKind::Audio).next().unwrap();
        assert_eq!(audio.payload.len(), 8); // 4 mono samples as i16

        fs::remove_file(&path).ok();
    }

    #[test]
    fn append_before_writing_is_rejected() {
        let path = temp_file_path("not_writing.avmx");
        let mut writer = ContainerFileWriter::create(path.clone()).unwrap();
        writer.add_track(TrackKind::Video, video_codec()).unwrap();
        assert!(!writer.is_ready(TrackKind::Video));
        let err = writer
            .append(TrackKind::Video, SampleData::Video(&pixel_buffer()), MediaTime::ZERO)
            .unwrap_err();
        assert_eq!(err, WriteError::NotWriting(TrackKind::Video));
    }

    #[test]
    fn append_after_finish_is_rejected() {
        let path = temp_file_path("finished.avmx");
        let mut writer = started_writer(&path);
        writer.mark_finished(TrackKind::Video);
        assert!(!writer.is_ready(TrackKind::Video));
        assert!(writer.is_ready(TrackKind::Audio));
        let err = writer
            .append(TrackKind::Video, SampleData::Video(&pixel_buffer()), MediaTime::ZERO)
            .unwrap_err();
        assert_eq!(err, WriteError::NotWriting(TrackKind::Video));
    }

    #[test]
    fn decreasing_times_are_rejected() {
        let path = temp_file_path("order.avmx");
        let mut writer = started_writer(&path);
        let buffer = pixel_buffer();
        writer.append(TrackKind::Video, SampleData::Video(&buffer), MediaTime::from_millis(40)).unwrap();
        let err = writer
            .append(TrackKind::Video, SampleData::Video(&buffer), MediaTime::from_millis(10))
            .unwrap_err();
        assert!(matches!(err, WriteError::OutOfOrder { kind: TrackKind::Video, .. }));
    }

    #[test]
    fn malformed_audio_is_rejected_without_writing() {
        let path = temp_file_path("malformed.avmx");
        let mut writer = started_writer(&path);
        let before = writer.bytes_written();

        for chunk in [
            AudioChunk::new(vec![0.1; 64], 2, 0.0, MediaTime::from_millis(10)),
            AudioChunk::new(vec![0.1; 64], 2, 1e-300, MediaTime::from_millis(10)),
            AudioChunk::new(vec![0.1; 64], 0, 8000.0, MediaTime::from_millis(10)),
        ] {
            let err = writer
                .append(TrackKind::Audio, SampleData::Audio(&chunk), MediaTime::from_millis(10))
                .unwrap_err();
            assert!(matches!(err, WriteError::MalformedSample { kind: TrackKind::Audio, .. }));
        }
        assert_eq!(writer.bytes_written(), before);

        let good = AudioChunk::new(vec![0.1; 4], 1, 8000.0, MediaTime::from_millis(10));
        writer.append(TrackKind::Audio, SampleData::Audio(&good), MediaTime::from_millis(10)).unwrap();
    }

    #[test]
    fn unknown_and_mismatched_tracks() {
        let path = temp_file_path("unknown.avmx");
        let mut writer = ContainerFileWriter::create(path.clone()).unwrap();
        writer.add_track(TrackKind::Video, video_codec()).unwrap();
        assert!(writer.add_track(TrackKind::Audio, video_codec()).is_err());
        writer.start_writing().unwrap();

        let chunk = AudioChunk::new(vec![0.0; 2], 1, 8000.0, MediaTime::ZERO);
        let err = writer
            .append(TrackKind::Audio, SampleData::Audio(&chunk), MediaTime::ZERO)
            .unwrap_err();
        assert_eq!(err, WriteError::UnknownTrack(TrackKind::Audio));

        let err = writer
            .append(TrackKind::Video, SampleData::Audio(&chunk), MediaTime::ZERO)
            .unwrap_err();
        assert!(matches!(err, WriteError::InvalidState(_)));
    }

    #[test]
    fn replaces_existing_output() {
        let path = temp_file_path("replace.avmx");
        fs::write(&path, b"stale").unwrap();
        let writer = ContainerFileWriter::create(path.clone()).unwrap();
        assert!(!path.exists());
        drop(writer);
    }

    #[test]
    fn dropped_writer_discards_partial_file() {
        let path = temp_file_path("crashed.avmx");
        let writer = started_writer(&path);
        let partial = writer.partial_path().to_path_buf();
        assert!(partial.exists());
        drop(writer);
        assert!(!partial.exists());
        assert!(!path.exists());
    }

    #[test]
    fn finalize_without_writing_fails_and_cleans_up() {
        let path = temp_file_path("never_started.avmx");
        let writer = ContainerFileWriter::create(path.clone()).unwrap();
        let partial = writer.partial_path().to_path_buf();
        let result = finalize_blocking(writer);
        assert!(matches!(result, Err(WriteError::InvalidState(_))));
        assert!(!partial.exists());
        assert!(!path.exists());
    }
}
