/// Recorder session state machine.
///
/// State transitions:
/// ```text
/// idle → active → finalizing → idle
/// ```
///
/// There is no way back from `Finalizing` to `Active`; frames and audio that
/// arrive after `stop` are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    #[default]
    Idle,
    Active,
    Finalizing,
}

impl RecorderState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn is_finalizing(&self) -> bool {
        matches!(self, Self::Finalizing)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Active => "active",
            Self::Finalizing => "finalizing",
        }
    }
}

/// Microphone authorization as reported by an audio capture provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicrophonePermission {
    Granted,
    Denied,
    Undetermined,
}

/// What video ingest did with one offered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Appended to the video track at this session-relative time.
    Written(crate::MediaTime),
    /// The session is not accepting frames.
    Inactive,
    /// Arrived less than one frame interval after the last accepted frame.
    Throttled,
    ConversionFailed,
    NotReady,
    OutOfOrder,
    WriteFailed,
}

/// What audio ingest did with one offered chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioOutcome {
    /// Appended to the audio track at this session-relative time.
    Written(crate::MediaTime),
    Inactive,
    /// No video frame has fixed the session zero point yet.
    NoZeroPoint,
    /// The session was started without an audio track.
    NoAudioTrack,
    /// Zero channels or a sample rate that cannot be resampled.
    Malformed,
    NotReady,
    OutOfOrder,
    WriteFailed,
}
