use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

use crate::models::media::MediaTime;

/// Source of wall-clock arrival times used by the frame throttle.
pub trait Clock: Send + Sync {
    fn now(&self) -> MediaTime;
}

/// Monotonic clock measuring time since its construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> MediaTime {
        let nanos = self.origin.elapsed().as_nanos();
        MediaTime::from_nanos(i64::try_from(nanos).unwrap_or(i64::MAX))
    }
}

/// Manually advanced clock for tests and offline replay.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicI64,
}

impl ManualClock {
    pub fn new(start: MediaTime) -> Self {
        Self {
            nanos: AtomicI64::new(start.as_nanos()),
        }
    }

    pub fn set(&self, time: MediaTime) {
        self.nanos.store(time.as_nanos(), Ordering::Release);
    }

    pub fn advance(&self, by: MediaTime) {
        self.nanos.fetch_add(by.as_nanos(), Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> MediaTime {
        MediaTime::from_nanos(self.nanos.load(Ordering::Acquire))
    }
}
