use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::models::config::{CodecConfig, RecorderConfiguration, VideoCodecConfig};
use crate::models::error::{RecordError, WriteError};
use crate::models::media::{AudioChunk, MediaTime, RecorderDiagnostics, SampleData, TrackKind, VideoFrame, VideoImage};
use crate::models::recording_result::RecordingResult;
use crate::models::state::{AudioOutcome, FrameOutcome, MicrophonePermission, RecorderState};
use crate::processing::audio_retiming::{retime_chunk, session_relative};
use crate::processing::frame_throttle::FrameThrottle;
use crate::processing::pixel_conversion::ArgbConverter;
use crate::session::finalize::{finalize_session, FinalizeContext, FinalizeHandle};
use crate::traits::audio_provider::{AudioCaptureProvider, AudioChunkCallback};
use crate::traits::clock::{Clock, MonotonicClock};
use crate::traits::container_writer::{ContainerWriter, ContainerWriterFactory};
use crate::traits::pixel_converter::PixelConverter;
use crate::traits::recorder_delegate::RecorderDelegate;
use crate::traits::storage_sink::StorageSink;

/// Mutable session state, protected by one `parking_lot::Mutex`.
///
/// The writer lives here too, so every append is serialized with the
/// accepting check: once `stop` flips the state under this lock, no ingest
/// path can reach the writer again.
struct SessionState {
    state: RecorderState,
    config: RecorderConfiguration,
    /// Bumped on every `start`; work begun in one session never lands in the next.
    generation: u64,
    output_path: Option<PathBuf>,
    start_timestamp: Option<MediaTime>,
    throttle: FrameThrottle,
    writer: Option<Box<dyn ContainerWriter>>,
    has_audio_track: bool,
    last_video_time: Option<MediaTime>,
    last_audio_time: Option<MediaTime>,
    diagnostics: RecorderDiagnostics,
}

impl SessionState {
    fn new(config: RecorderConfiguration) -> Self {
        let throttle = FrameThrottle::new(config.min_frame_interval());
        Self {
            state: RecorderState::Idle,
            config,
            generation: 0,
            output_path: None,
            start_timestamp: None,
            throttle,
            writer: None,
            has_audio_track: false,
            last_video_time: None,
            last_audio_time: None,
            diagnostics: RecorderDiagnostics::default(),
        }
    }

    fn accepting(&self, generation: u64) -> bool {
        self.state.is_active() && self.generation == generation
    }
}

/// State shared with the audio capture callback and the finalize thread.
struct Shared {
    session: Mutex<SessionState>,
    clock: Arc<dyn Clock>,
    converter: Arc<dyn PixelConverter>,
    delegate: Option<Arc<dyn RecorderDelegate>>,
}

impl Shared {
    fn notify_state(&self, state: RecorderState) {
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(state);
        }
    }

    fn notify_error(&self, error: &RecordError) {
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(error);
        }
    }

    /// Video ingest: throttle, fix the zero point, convert, append.
    fn ingest_frame(&self, image: &VideoImage, capture_timestamp: MediaTime) -> FrameOutcome {
        let (generation, adjusted, target) = {
            let mut s = self.session.lock();
            s.diagnostics.frames_offered += 1;
            if !s.state.is_active() {
                return FrameOutcome::Inactive;
            }
            if !s.throttle.admit(self.clock.now()) {
                s.diagnostics.frames_throttled += 1;
                return FrameOutcome::Throttled;
            }
            s.diagnostics.frames_accepted += 1;

            let start = match s.start_timestamp {
                Some(start) => start,
                None => {
                    log::info!("First frame accepted, session zero point at {}", capture_timestamp);
                    s.start_timestamp = Some(capture_timestamp);
                    capture_timestamp
                }
            };
            let target: VideoCodecConfig = s.config.video.clone();
            (s.generation, session_relative(capture_timestamp, start), target)
        };

        // Conversion runs outside the lock so audio ingest is never held up by it.
        let buffer = match self.converter.convert(image, &target) {
            Ok(buffer) => buffer,
            Err(e) => {
                log::warn!("Dropping frame at {}: {}", adjusted, e);
                self.session.lock().diagnostics.conversion_failures += 1;
                self.notify_error(&e);
                return FrameOutcome::ConversionFailed;
            }
        };

        let failure = {
            let mut s = self.session.lock();
            if !s.accepting(generation) {
                return FrameOutcome::Inactive;
            }
            if s.last_video_time.is_some_and(|last| adjusted < last) {
                log::debug!("Dropping frame at {}: earlier than previous video sample", adjusted);
                s.diagnostics.frames_dropped_out_of_order += 1;
                return FrameOutcome::OutOfOrder;
            }

            let SessionState {
                writer,
                diagnostics,
                last_video_time,
                ..
            } = &mut *s;
            let Some(writer) = writer.as_mut() else {
                return FrameOutcome::Inactive;
            };
            if !writer.is_ready(TrackKind::Video) {
                diagnostics.frames_dropped_not_ready += 1;
                return FrameOutcome::NotReady;
            }
            let appended = writer.append(TrackKind::Video, SampleData::Video(&buffer), adjusted);
            match appended {
                Ok(()) => {
                    *last_video_time = Some(adjusted);
                    diagnostics.frames_written += 1;
                    return FrameOutcome::Written(adjusted);
                }
                Err(WriteError::NotReady(_)) => {
                    diagnostics.frames_dropped_not_ready += 1;
                    return FrameOutcome::NotReady;
                }
                Err(e) => {
                    diagnostics.write_failures += 1;
                    e
                }
            }
        };

        log::error!("Failed to append video frame at {}: {}", adjusted, failure);
        self.notify_error(&RecordError::Write(failure));
        FrameOutcome::WriteFailed
    }

    /// Audio ingest: retime onto the video zero point and append.
    fn ingest_audio(&self, chunk: AudioChunk) -> AudioOutcome {
        let (adjusted, failure) = {
            let mut s = self.session.lock();
            s.diagnostics.audio_chunks_offered += 1;
            if !s.state.is_active() {
                return AudioOutcome::Inactive;
            }
            if !s.has_audio_track {
                return AudioOutcome::NoAudioTrack;
            }
            if let Err(reason) = chunk.validate() {
                log::warn!("Dropping audio chunk at {}: {}", chunk.hardware_timestamp, reason);
                s.diagnostics.audio_dropped_malformed += 1;
                return AudioOutcome::Malformed;
            }
            let Some(start) = s.start_timestamp else {
                s.diagnostics.audio_dropped_no_zero_point += 1;
                return AudioOutcome::NoZeroPoint;
            };

            let (chunk, adjusted) = retime_chunk(chunk, start);
            if adjusted.is_negative() || s.last_audio_time.is_some_and(|last| adjusted < last) {
                log::debug!("Dropping audio chunk at {}: before previous audio sample or zero point", adjusted);
                s.diagnostics.audio_dropped_out_of_order += 1;
                return AudioOutcome::OutOfOrder;
            }

            let SessionState {
                writer,
                diagnostics,
                last_audio_time,
                ..
            } = &mut *s;
            let Some(writer) = writer.as_mut() else {
                return AudioOutcome::Inactive;
            };
            if !writer.is_ready(TrackKind::Audio) {
                diagnostics.audio_dropped_not_ready += 1;
                return AudioOutcome::NotReady;
            }
            let appended = writer.append(TrackKind::Audio, SampleData::Audio(&chunk), adjusted);
            match appended {
                Ok(()) => {
                    *last_audio_time = Some(adjusted);
                    diagnostics.audio_chunks_written += 1;
                    return AudioOutcome::Written(adjusted);
                }
                Err(WriteError::NotReady(_)) => {
                    diagnostics.audio_dropped_not_ready += 1;
                    return AudioOutcome::NotReady;
                }
                Err(e) => {
                    diagnostics.write_failures += 1;
                    (adjusted, e)
                }
            }
        };

        log::error!("Failed to append audio chunk at {}: {}", adjusted, failure);
        self.notify_error(&RecordError::Write(failure));
        AudioOutcome::WriteFailed
    }

    /// Abandon a session that never finished starting. Dropping the writer
    /// discards whatever it had allocated.
    fn abort_start(&self, generation: u64) {
        let mut s = self.session.lock();
        if s.generation == generation {
            s.writer = None;
            s.state = RecorderState::Idle;
        }
    }

    /// Called by the finalize thread once the outcome is known.
    fn finish_session(&self, result: &Result<RecordingResult, RecordError>) {
        match result {
            Ok(recording) => {
                if let Some(ref delegate) = self.delegate {
                    delegate.on_recording_finished(recording);
                }
            }
            Err(e) => {
                log::error!("Recording failed to finalize: {}", e);
                self.notify_error(e);
            }
        }
        {
            let mut s = self.session.lock();
            s.writer = None;
            s.state = RecorderState::Idle;
        }
        self.notify_state(RecorderState::Idle);
    }
}

/// Builder for [`SynchronizedRecorder`]. Capabilities not supplied fall back
/// to a [`MonotonicClock`], an [`ArgbConverter`], no delegate and no storage.
pub struct RecorderBuilder<A: AudioCaptureProvider> {
    config: RecorderConfiguration,
    audio: A,
    writer_factory: Box<dyn ContainerWriterFactory>,
    clock: Arc<dyn Clock>,
    converter: Arc<dyn PixelConverter>,
    delegate: Option<Arc<dyn RecorderDelegate>>,
    storage: Option<Arc<dyn StorageSink>>,
}

impl<A: AudioCaptureProvider> RecorderBuilder<A> {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn pixel_converter(mut self, converter: Arc<dyn PixelConverter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn delegate(mut self, delegate: Arc<dyn RecorderDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn StorageSink>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn build(self) -> SynchronizedRecorder<A> {
        SynchronizedRecorder {
            shared: Arc::new(Shared {
                session: Mutex::new(SessionState::new(self.config)),
                clock: self.clock,
                converter: self.converter,
                delegate: self.delegate,
            }),
            audio: Mutex::new(self.audio),
            writer_factory: self.writer_factory,
            storage: self.storage,
        }
    }
}

/// Records rendered frames and microphone audio into one container on a
/// shared timeline.
///
/// Data flow:
/// ```text
/// [Renderer]  → on_frame ───────→ throttle → zero point → convert ─┐
///                                                                  ├→ [ContainerWriter] → finalize → [StorageSink]
/// [Mic Provider] → on_audio_chunk → retime against zero point ─────┘
/// ```
///
/// Video ingest runs on the render thread, audio ingest on the provider's
/// capture thread, and `stop` may be called from anywhere. All methods take
/// `&self`; share the recorder behind an `Arc`.
pub struct SynchronizedRecorder<A: AudioCaptureProvider> {
    shared: Arc<Shared>,
    /// Also serializes `start`/`stop`.
    audio: Mutex<A>,
    writer_factory: Box<dyn ContainerWriterFactory>,
    storage: Option<Arc<dyn StorageSink>>,
}

impl<A: AudioCaptureProvider> SynchronizedRecorder<A> {
    pub fn new(
        config: RecorderConfiguration,
        audio: A,
        writer_factory: impl ContainerWriterFactory + 'static,
    ) -> Self {
        Self::builder(config, audio, writer_factory).build()
    }

    pub fn builder(
        config: RecorderConfiguration,
        audio: A,
        writer_factory: impl ContainerWriterFactory + 'static,
    ) -> RecorderBuilder<A> {
        RecorderBuilder {
            config,
            audio,
            writer_factory: Box::new(writer_factory),
            clock: Arc::new(MonotonicClock::new()),
            converter: Arc::new(ArgbConverter::new()),
            delegate: None,
            storage: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.shared.session.lock().state
    }

    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    pub fn diagnostics(&self) -> RecorderDiagnostics {
        self.shared.session.lock().diagnostics.clone()
    }

    /// Capture timestamp of the first accepted frame of the current session.
    pub fn start_timestamp(&self) -> Option<MediaTime> {
        self.shared.session.lock().start_timestamp
    }

    /// Output path of the current (or most recent) session.
    pub fn output_path(&self) -> Option<PathBuf> {
        self.shared.session.lock().output_path.clone()
    }

    pub fn configuration(&self) -> RecorderConfiguration {
        self.shared.session.lock().config.clone()
    }

    /// Replace the configuration. Only allowed while idle.
    pub fn configure(&self, config: RecorderConfiguration) -> Result<(), RecordError> {
        config.validate().map_err(RecordError::Configuration)?;
        let mut s = self.shared.session.lock();
        if !s.state.is_idle() {
            return Err(RecordError::InvalidState(format!(
                "cannot configure while {}",
                s.state.name()
            )));
        }
        s.config = config;
        Ok(())
    }

    /// Allocate the output, set up tracks, start audio capture and begin
    /// accepting frames. Transitions: idle → active.
    pub fn start(&self) -> Result<(), RecordError> {
        let mut audio = self.audio.lock();

        let config = {
            let s = self.shared.session.lock();
            if !s.state.is_idle() {
                return Err(RecordError::InvalidState(format!("cannot start while {}", s.state.name())));
            }
            s.config.clone()
        };
        config.validate().map_err(RecordError::Configuration)?;

        let record_audio = resolve_microphone(&mut *audio, &config)?;
        let writer = self.open_writer(&config, record_audio)?;

        let generation = {
            let mut s = self.shared.session.lock();
            s.generation += 1;
            s.state = RecorderState::Active;
            s.output_path = Some(config.output_path.clone());
            s.start_timestamp = None;
            s.throttle = FrameThrottle::new(config.min_frame_interval());
            s.writer = Some(writer);
            s.has_audio_track = record_audio;
            s.last_video_time = None;
            s.last_audio_time = None;
            s.diagnostics = RecorderDiagnostics::default();
            s.generation
        };

        if record_audio {
            let shared = Arc::clone(&self.shared);
            let callback: AudioChunkCallback = Arc::new(move |chunk: AudioChunk| {
                shared.ingest_audio(chunk);
            });
            if let Err(e) = audio.start(callback) {
                log::error!("Failed to start audio capture: {}", e);
                self.shared.abort_start(generation);
                return Err(e);
            }
        }
        drop(audio);

        log::info!(
            "Recording started: {} ({}x{}, max {} fps, audio {})",
            config.output_path.display(),
            config.video.width,
            config.video.height,
            config.max_frame_rate,
            if record_audio { "on" } else { "off" }
        );
        self.shared.notify_state(RecorderState::Active);
        Ok(())
    }

    /// Stop accepting data and finalize the container on a background thread.
    /// Transitions: active → finalizing → idle.
    ///
    /// Returns `None` when no session is active, so a second call is a no-op.
    /// Once this returns, no further frame or audio data reaches the writer.
    pub fn stop(&self) -> Option<FinalizeHandle> {
        let mut audio = self.audio.lock();

        let (writer, context) = {
            let mut s = self.shared.session.lock();
            if !s.state.is_active() {
                log::debug!("stop ignored while {}", s.state.name());
                return None;
            }
            s.state = RecorderState::Finalizing;
            let Some(mut writer) = s.writer.take() else {
                log::error!("Active session had no writer");
                s.state = RecorderState::Idle;
                return None;
            };
            writer.mark_finished(TrackKind::Video);
            if s.has_audio_track {
                writer.mark_finished(TrackKind::Audio);
            }
            let context = FinalizeContext {
                config: s.config.clone(),
                has_audio_track: s.has_audio_track,
                diagnostics: s.diagnostics.clone(),
                storage: self.storage.clone(),
                delegate: self.shared.delegate.clone(),
            };
            (writer, context)
        };
        let stop_failure = if context.has_audio_track { audio.stop().err() } else { None };
        // Delegates may call back into start/stop.
        drop(audio);
        if let Some(e) = stop_failure {
            log::warn!("Failed to stop audio capture: {}", e);
            self.shared.notify_error(&e);
        }
        self.shared.notify_state(RecorderState::Finalizing);

        let (tx, rx) = mpsc::channel();
        let fallback_tx = tx.clone();
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("av-finalize".into())
            .spawn(move || {
                let result = finalize_session(writer, &context);
                shared.finish_session(&result);
                tx.send(result).ok();
            });

        if let Err(e) = spawned {
            // The closure, and with it the writer, was dropped: the partial file is gone.
            let result = Err(RecordError::Finalization(format!("failed to spawn finalize thread: {}", e)));
            self.shared.finish_session(&result);
            fallback_tx.send(result).ok();
        }

        Some(FinalizeHandle::new(rx))
    }

    /// Offer a rendered frame captured at `capture_timestamp`.
    ///
    /// Never blocks on the writer; frames that cannot be taken are dropped.
    pub fn on_frame(&self, image: &VideoImage, capture_timestamp: MediaTime) -> FrameOutcome {
        self.shared.ingest_frame(image, capture_timestamp)
    }

    pub fn on_video_frame(&self, frame: &VideoFrame) -> FrameOutcome {
        self.shared.ingest_frame(&frame.image, frame.capture_timestamp)
    }

    /// Offer a microphone chunk. The audio provider's callback lands here too.
    pub fn on_audio_chunk(&self, chunk: AudioChunk) -> AudioOutcome {
        self.shared.ingest_audio(chunk)
    }

    fn open_writer(
        &self,
        config: &RecorderConfiguration,
        record_audio: bool,
    ) -> Result<Box<dyn ContainerWriter>, RecordError> {
        let init_err = |e: WriteError| RecordError::WriterInit(e.to_string());

        let mut writer = self
            .writer_factory
            .create(&config.output_path, config)
            .map_err(init_err)?;
        writer
            .add_track(TrackKind::Video, CodecConfig::Video(config.video.clone()))
            .map_err(init_err)?;
        if record_audio {
            writer
                .add_track(TrackKind::Audio, CodecConfig::Audio(config.audio.clone()))
                .map_err(init_err)?;
        }
        writer.start_writing().map_err(init_err)?;
        Ok(writer)
    }
}

/// Decide whether this session records audio.
///
/// An undetermined permission is requested first. A microphone that is
/// missing or not granted fails the start when audio is required, otherwise
/// the session goes ahead video-only.
fn resolve_microphone<A: AudioCaptureProvider>(
    audio: &mut A,
    config: &RecorderConfiguration,
) -> Result<bool, RecordError> {
    let permission = match audio.permission() {
        MicrophonePermission::Undetermined => audio.request_permission(),
        granted_or_denied => granted_or_denied,
    };
    let available = audio.is_available();
    if available && permission == MicrophonePermission::Granted {
        return Ok(true);
    }

    if config.require_audio {
        return Err(if permission != MicrophonePermission::Granted {
            RecordError::PermissionDenied
        } else {
            RecordError::AudioCapture("no microphone available".into())
        });
    }
    log::warn!(
        "Microphone unusable (available: {}, permission: {:?}); recording video only",
        available,
        permission
    );
    Ok(false)
}
