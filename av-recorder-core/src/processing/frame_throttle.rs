use crate::models::media::MediaTime;

/// Caps the accepted frame rate by wall-clock arrival time.
///
/// The first frame offered after a reset is always accepted. Later frames are
/// accepted only when at least `min_interval` has passed since the arrival of
/// the last accepted frame.
#[derive(Debug, Clone)]
pub struct FrameThrottle {
    min_interval: MediaTime,
    last_accepted: Option<MediaTime>,
}

impl FrameThrottle {
    pub fn new(min_interval: MediaTime) -> Self {
        Self {
            min_interval,
            last_accepted: None,
        }
    }

    /// Decide whether a frame arriving at `arrival` is accepted, recording it if so.
    pub fn admit(&mut self, arrival: MediaTime) -> bool {
        match self.last_accepted {
            Some(last) if arrival - last < self.min_interval => false,
            _ => {
                self.last_accepted = Some(arrival);
                true
            }
        }
    }

    pub fn last_accepted(&self) -> Option<MediaTime> {
        self.last_accepted
    }

    pub fn min_interval(&self) -> MediaTime {
        self.min_interval
    }

    pub fn reset(&mut self) {
        self.last_accepted = None;
    }
}
