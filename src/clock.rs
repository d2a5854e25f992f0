// src/clock.rs

// clock module definition and implementations

// dependencies
use tokio::time::Instant;

/// Clock trait to abstract time retrieval.
/// Implementors must be thread-safe (Send + Sync).
/// The `now` method returns nanoseconds elapsed since an arbitrary, fixed origin.
/// Readings must never go backwards; the buckets measure durations by subtracting them.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Monotonic clock measuring nanoseconds since the clock was created.
///
/// Backed by [`tokio::time::Instant`], so a runtime with paused time
/// (`#[tokio::test(start_paused = true)]`) drives it deterministically.
/// Clones share the same origin, so readings taken through any clone are comparable.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> u64 {
        // saturates after ~584 years
        u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}
