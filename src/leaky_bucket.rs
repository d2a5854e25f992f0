// src/leaky_bucket.rs

// leaky bucket: a hard ceiling of in-flight admissions drained at a fixed cadence

// dependencies
use crate::clock::{Clock, MonotonicClock};
use crate::config::LeakyBucketConfig;
use crate::errors::RateLimiterError;
use crate::limiter::{Decision, RateLimiter, wait_for_admission};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, trace};

/// Leaky bucket rate limiter.
///
/// Each admission adds one unit to the bucket; one unit leaks out every
/// `leak_interval`. Admission is refused while the bucket holds `capacity` units.
/// Unlike [`TokenBucket`](crate::TokenBucket) the bucket starts empty and never
/// stores credit while idle, so traffic is smoothed rather than allowed to burst
/// beyond what has drained.
#[derive(Debug)]
pub struct LeakyBucket<C = MonotonicClock>
where
    C: Clock,
{
    capacity: u64,
    leak_interval: Duration,
    leak_interval_nanos: u64,
    state: Mutex<LeakyBucketState>,
    clock: C,
}

#[derive(Debug)]
struct LeakyBucketState {
    current: u64,
    last_leak_nanos: u64,
}

impl LeakyBucketState {
    fn leak(&mut self, now_nanos: u64, interval_nanos: u64) {
        // an empty bucket has nothing to drain and must not bank leaks for later
        if self.current == 0 {
            self.last_leak_nanos = now_nanos;
            return;
        }

        let leaked = now_nanos.saturating_sub(self.last_leak_nanos) / interval_nanos;
        if leaked == 0 {
            return;
        }

        if leaked >= self.current {
            self.current = 0;
            self.last_leak_nanos = now_nanos;
        } else {
            self.current -= leaked;
            // keep the partial interval so frequent calls still drain on schedule
            self.last_leak_nanos += leaked * interval_nanos;
        }
    }
}

impl LeakyBucket<MonotonicClock> {
    /// Create a bucket holding at most `capacity` units that frees one unit per
    /// `leak_interval`, using a [`MonotonicClock`].
    pub fn new(capacity: u64, leak_interval: Duration) -> Result<Self, RateLimiterError> {
        Self::with_config(
            LeakyBucketConfig::new(capacity, leak_interval),
            MonotonicClock::new(),
        )
    }
}

impl<C> LeakyBucket<C>
where
    C: Clock,
{
    /// Create a bucket from a config object and an explicit clock
    pub fn with_config(config: LeakyBucketConfig, clock: C) -> Result<Self, RateLimiterError> {
        config.validate()?;
        Ok(Self::from_validated(config, clock))
    }

    pub(crate) fn from_validated(config: LeakyBucketConfig, clock: C) -> Self {
        debug!(
            capacity = config.capacity,
            leak_interval_ms = config.leak_interval.as_millis() as u64,
            "leaky bucket created"
        );
        let now = clock.now();
        Self {
            capacity: config.capacity,
            leak_interval: config.leak_interval,
            leak_interval_nanos: u64::try_from(config.leak_interval.as_nanos()).unwrap_or(u64::MAX),
            state: Mutex::new(LeakyBucketState {
                current: 0,
                last_leak_nanos: now,
            }),
            clock,
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn leak_interval(&self) -> Duration {
        self.leak_interval
    }

    /// Units currently held, after leaking
    pub fn in_flight(&self) -> u64 {
        self.lock_leaked().current
    }

    /// Try to add one unit, reporting how long a rejected caller should back off
    pub fn check(&self) -> Decision {
        let mut state = self.lock_leaked();

        if state.current < self.capacity {
            state.current += 1;
            Decision::allowed(self.capacity - state.current)
        } else {
            trace!(capacity = self.capacity, "leaky bucket full");
            // leaks are discrete, so poll once per interval
            Decision::rejected(self.leak_interval, 0)
        }
    }

    fn lock_leaked(&self) -> MutexGuard<'_, LeakyBucketState> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.leak(self.clock.now(), self.leak_interval_nanos);
        state
    }
}

impl<C> RateLimiter for LeakyBucket<C>
where
    C: Clock,
{
    fn allow(&self) -> bool {
        self.check().allowed
    }

    async fn wait<F>(&self, cancel: F) -> Result<(), RateLimiterError>
    where
        F: Future + Send,
    {
        wait_for_admission(|| self.check(), cancel).await
    }
}
