// src/limiter.rs

// the admission contract shared by both buckets, plus the blocking wait loop

// dependencies
use crate::errors::RateLimiterError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace};

/// Admission contract implemented by [`TokenBucket`](crate::TokenBucket) and
/// [`LeakyBucket`](crate::LeakyBucket).
///
/// Callers that only need "may this operation proceed?" should be generic over
/// this trait so either engine can be plugged in.
pub trait RateLimiter: Send + Sync {
    /// Non-blocking admission attempt. Returns `true` and consumes budget when admitted.
    fn allow(&self) -> bool;

    /// Waits until the operation is admitted or `cancel` completes.
    ///
    /// `cancel` is any future whose completion means "give up": a oneshot receiver,
    /// `Notify::notified()`, a timeout. The limiter's lock is never held while
    /// suspended, so concurrent `allow` calls keep being served.
    ///
    /// Returns `Err(RateLimiterError::Cancelled)` when the signal wins; no budget
    /// is consumed in that case.
    fn wait<F>(&self, cancel: F) -> impl Future<Output = Result<(), RateLimiterError>> + Send
    where
        F: Future + Send;
}

/// Result of an admission check with metadata for callers that want to back off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the operation was admitted
    pub allowed: bool,
    /// How long until a retry can succeed (only when rejected)
    pub retry_after: Option<Duration>,
    /// Whole tokens or free slots left after this decision
    pub remaining: u64,
}

impl Decision {
    pub(crate) fn allowed(remaining: u64) -> Self {
        Self {
            allowed: true,
            retry_after: None,
            remaining,
        }
    }

    pub(crate) fn rejected(retry_after: Duration, remaining: u64) -> Self {
        Self {
            allowed: false,
            retry_after: Some(retry_after),
            remaining,
        }
    }
}

/// Repeats `check` until it admits, sleeping for each rejection's `retry_after`
/// and racing that sleep against `cancel`.
///
/// `check` must take and release the limiter lock itself; nothing here holds it
/// across an await.
pub(crate) async fn wait_for_admission<P, F>(mut check: P, cancel: F) -> Result<(), RateLimiterError>
where
    P: FnMut() -> Decision,
    F: Future,
{
    tokio::pin!(cancel);

    loop {
        let decision = check();
        if decision.allowed {
            return Ok(());
        }

        // retry_after is always set on rejection; the fallback only keeps the loop from spinning
        let delay = decision.retry_after.unwrap_or(Duration::from_millis(1));
        trace!(delay_nanos = delay.as_nanos() as u64, "admission rejected, waiting");

        tokio::select! {
            // a signal that is already done wins over a timer firing at the same instant
            biased;
            _ = &mut cancel => {
                debug!("wait cancelled before admission");
                return Err(RateLimiterError::Cancelled);
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
