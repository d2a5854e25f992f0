// src/token_bucket.rs

// token bucket: bursts up to capacity, then a sustained refill rate

// dependencies
use crate::clock::{Clock, MonotonicClock};
use crate::config::TokenBucketConfig;
use crate::errors::RateLimiterError;
use crate::limiter::{Decision, RateLimiter, wait_for_admission};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, trace};

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Token bucket rate limiter.
///
/// The bucket starts full with `capacity` tokens and gains `refill_rate` tokens per
/// second, never holding more than `capacity`. Every admitted operation takes one
/// token, so up to `capacity` operations pass instantly before the refill rate
/// becomes the sustained throughput.
///
/// Refill is lazy: it happens on each `allow`/`check`/`wait` call, there is no
/// background task. Whole tokens are credited at a time and the fractional part of
/// the credit is carried forward, so frequent calls with tiny elapsed times neither
/// gain nor lose credit over the long run.
///
/// ```rust
/// use bucket_limiter::{RateLimiter, TokenBucket};
///
/// let bucket = TokenBucket::new(2, 1.0).unwrap();
/// assert!(bucket.allow());
/// assert!(bucket.allow());
/// assert!(!bucket.allow());
/// ```
#[derive(Debug)]
pub struct TokenBucket<C = MonotonicClock>
where
    C: Clock,
{
    capacity: u64,
    refill_rate_per_second: f64,
    state: Mutex<TokenBucketState>,
    clock: C,
}

#[derive(Debug)]
struct TokenBucketState {
    tokens: f64,
    // fractional credit not yet turned into a token, always in [0, 1)
    remainder: f64,
    last_refill_nanos: u64,
}

impl TokenBucketState {
    fn refill(&mut self, now_nanos: u64, rate_per_second: f64, capacity: u64) {
        let elapsed_nanos = now_nanos.saturating_sub(self.last_refill_nanos);
        let credit = rate_per_second * (elapsed_nanos as f64 / NANOS_PER_SECOND) + self.remainder;
        let whole = credit.trunc();

        self.tokens = (self.tokens + whole).min(capacity as f64);
        self.remainder = credit - whole;
        // advance by exactly the elapsed time that was credited
        self.last_refill_nanos += elapsed_nanos;
    }

    // time until tokens + remainder reaches one whole token, rounded up to the next nanosecond
    fn time_to_next_token(&self, rate_per_second: f64) -> Duration {
        let deficit = (1.0 - self.tokens - self.remainder).max(0.0);
        let nanos = (deficit / rate_per_second * NANOS_PER_SECOND).ceil() as u64;
        Duration::from_nanos(nanos.max(1))
    }
}

impl TokenBucket<MonotonicClock> {
    /// Create a bucket holding `capacity` tokens that refills `refill_rate_per_second`
    /// tokens per second, using a [`MonotonicClock`].
    pub fn new(capacity: u64, refill_rate_per_second: f64) -> Result<Self, RateLimiterError> {
        Self::with_config(
            TokenBucketConfig::new(capacity, refill_rate_per_second),
            MonotonicClock::new(),
        )
    }
}

impl<C> TokenBucket<C>
where
    C: Clock,
{
    /// Create a bucket from a config object and an explicit clock
    pub fn with_config(config: TokenBucketConfig, clock: C) -> Result<Self, RateLimiterError> {
        config.validate()?;
        Ok(Self::from_validated(config, clock))
    }

    pub(crate) fn from_validated(config: TokenBucketConfig, clock: C) -> Self {
        debug!(
            capacity = config.capacity,
            refill_rate_per_second = config.refill_rate_per_second,
            "token bucket created"
        );
        let now = clock.now();
        Self {
            capacity: config.capacity,
            refill_rate_per_second: config.refill_rate_per_second,
            state: Mutex::new(TokenBucketState {
                tokens: config.capacity as f64,
                remainder: 0.0,
                last_refill_nanos: now,
            }),
            clock,
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate_per_second
    }

    /// Whole tokens available right now, after refilling
    pub fn available(&self) -> u64 {
        self.lock_refilled().tokens as u64
    }

    /// Try to take one token, reporting how long a rejected caller should back off
    pub fn check(&self) -> Decision {
        let mut state = self.lock_refilled();

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            Decision::allowed(state.tokens as u64)
        } else {
            let retry_after = state.time_to_next_token(self.refill_rate_per_second);
            trace!(retry_after_nanos = retry_after.as_nanos() as u64, "token bucket empty");
            Decision::rejected(retry_after, 0)
        }
    }

    // locks the state and brings it up to date with the clock
    fn lock_refilled(&self) -> MutexGuard<'_, TokenBucketState> {
        // refill never panics mid-update, so a poisoned state is still consistent
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.refill(self.clock.now(), self.refill_rate_per_second, self.capacity);
        state
    }
}

impl<C> RateLimiter for TokenBucket<C>
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
