// src/config.rs

//! Configuration types for the bucket limiters

// dependencies
use crate::errors::RateLimiterError;
use std::time::Duration;

/// Configuration for a token bucket
#[derive(Debug, Clone)]
pub struct TokenBucketConfig {
    pub(crate) capacity: u64,
    pub(crate) refill_rate_per_second: f64,
}

impl TokenBucketConfig {
    /// Create a new configuration with capacity and refill rate settings
    pub fn new(capacity: u64, refill_rate_per_second: f64) -> Self {
        Self {
            capacity,
            refill_rate_per_second,
        }
    }

    /// Builder-style: set bucket capacity (also the initial token count)
    pub fn capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Builder-style: set tokens added per second
    pub fn refill_rate(mut self, refill_rate_per_second: f64) -> Self {
        self.refill_rate_per_second = refill_rate_per_second;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), RateLimiterError> {
        if self.capacity < 1 {
            return Err(RateLimiterError::InvalidCapacity);
        }
        // is_finite also rejects NaN
        if self.refill_rate_per_second <= 0.0 || !self.refill_rate_per_second.is_finite() {
            return Err(RateLimiterError::InvalidRate);
        }
        Ok(())
    }
}

/// Configuration for a leaky bucket
#[derive(Debug, Clone)]
pub struct LeakyBucketConfig {
    pub(crate) capacity: u64,
    pub(crate) leak_interval: Duration,
}

impl LeakyBucketConfig {
    /// Create a new configuration with capacity and leak interval settings
    pub fn new(capacity: u64, leak_interval: Duration) -> Self {
        Self {
            capacity,
            leak_interval,
        }
    }

    /// Builder-style: set bucket capacity
    pub fn capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Builder-style: set the time needed to free one slot
    pub fn leak_interval(mut self, leak_interval: Duration) -> Self {
        self.leak_interval = leak_interval;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), RateLimiterError> {
        if self.capacity < 1 {
            return Err(RateLimiterError::InvalidCapacity);
        }
        if self.leak_interval.is_zero() {
            return Err(RateLimiterError::InvalidInterval);
        }
        Ok(())
    }
}
