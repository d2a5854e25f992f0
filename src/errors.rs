// src/errors.rs

// error handling for the bucket limiters

/// Error type for limiter configuration issues and abandoned waits.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RateLimiterError {
    /// capacity < 1
    #[error("Capacity must be at least 1")]
    InvalidCapacity,
    /// refill rate <= 0, NaN or infinite
    #[error("Refill rate must be positive and finite")]
    InvalidRate,
    /// leak interval or throttle period of zero
    #[error("Interval must be greater than zero")]
    InvalidInterval,
    /// The cancellation signal fired before admission; nothing was consumed.
    #[error("Wait cancelled before admission")]
    Cancelled,
}
