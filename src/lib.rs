// src/lib.rs

//! # Bucket Limiter
//!
//! Token-bucket and leaky-bucket admission control with cancellable waits.
//!
//! Both engines implement [`RateLimiter`]: `allow` answers immediately, `wait`
//! suspends the calling task until admission or until a caller-supplied
//! cancellation future completes.
//!
//! ## Quick Example
//!
//! ```rust
//! use bucket_limiter::{RateLimiter, TokenBucket};
//!
//! let limiter = TokenBucket::new(10, 5.0).unwrap();
//!
//! if limiter.allow() {
//!     println!("Request allowed");
//! } else {
//!     let decision = limiter.check();
//!     println!("Rate limited - retry after {:?}", decision.retry_after);
//! }
//! ```
//!
//! Waiting with a deadline as the cancellation signal:
//!
//! ```rust
//! use bucket_limiter::{LeakyBucket, RateLimiter, RateLimiterError};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let limiter = LeakyBucket::new(1, Duration::from_secs(60)).unwrap();
//! limiter.wait(std::future::pending::<()>()).await.unwrap();
//!
//! let gave_up = limiter.wait(tokio::time::sleep(Duration::from_millis(5))).await;
//! assert_eq!(gave_up, Err(RateLimiterError::Cancelled));
//! # }
//! ```

// private modules
mod clock;
mod config;
mod errors;
mod keyed;
mod leaky_bucket;
mod limiter;
mod throttle;
mod token_bucket;

// public API exports
pub use clock::{Clock, MonotonicClock};
pub use config::{LeakyBucketConfig, TokenBucketConfig};
pub use errors::RateLimiterError;
pub use keyed::KeyedLimiter;
pub use leaky_bucket::LeakyBucket;
pub use limiter::{Decision, RateLimiter};
pub use throttle::throttle;
pub use token_bucket::TokenBucket;
