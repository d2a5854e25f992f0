// src/keyed.rs

// one limiter per client key, created on first use

// dependencies
use crate::clock::{Clock, MonotonicClock};
use crate::config::{LeakyBucketConfig, TokenBucketConfig};
use crate::errors::RateLimiterError;
use crate::leaky_bucket::LeakyBucket;
use crate::limiter::RateLimiter;
use crate::token_bucket::TokenBucket;
use dashmap::DashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

type Factory<L> = Box<dyn Fn() -> L + Send + Sync>;

/// Independent limiters per client.
/// K is the type used to identify clients (e.g., String, u64, IpAddr).
/// L is the limiter each client gets; C is the clock used to track idleness.
/// We use `Arc<DashMap>` for thread-safe concurrent access to client state.
pub struct KeyedLimiter<K, L, C = MonotonicClock>
where
    K: Hash + Eq + Clone,
    C: Clock,
{
    limiters: Arc<DashMap<K, KeyedEntry<L>>>,
    factory: Factory<L>,
    clock: C,
}

struct KeyedEntry<L> {
    limiter: Arc<L>,
    last_seen_nanos: AtomicU64,
}

impl<K, L, C> KeyedLimiter<K, L, C>
where
    K: Hash + Eq + Clone,
    L: RateLimiter,
    C: Clock,
{
    /// Create a keyed limiter that builds each client's limiter with `factory`
    pub fn new<Fac>(clock: C, factory: Fac) -> Self
    where
        Fac: Fn() -> L + Send + Sync + 'static,
    {
        Self {
            limiters: Arc::new(DashMap::new()),
            factory: Box::new(factory),
            clock,
        }
    }

    /// Non-blocking admission for `key`
    pub fn allow(&self, key: &K) -> bool {
        self.limiter_for(key).allow()
    }

    /// Wait for admission for `key`, or until `cancel` completes
    pub async fn wait<F>(&self, key: &K, cancel: F) -> Result<(), RateLimiterError>
    where
        F: Future + Send,
    {
        // the map guard is released before suspending
        let limiter = self.limiter_for(key);
        limiter.wait(cancel).await
    }

    /// Drop clients that have not been seen for at least `max_idle`.
    /// Clients with a wait in progress are kept. Returns the number removed.
    pub fn cleanup_idle(&self, max_idle: Duration) -> usize {
        let now = self.clock.now();
        let max_idle_nanos = u64::try_from(max_idle.as_nanos()).unwrap_or(u64::MAX);
        let mut removed = 0;

        self.limiters.retain(|_, entry| {
            let idle = now.saturating_sub(entry.last_seen_nanos.load(Ordering::Relaxed));
            let keep = idle < max_idle_nanos || Arc::strong_count(&entry.limiter) > 1;
            if !keep {
                removed += 1;
            }
            keep
        });

        if removed > 0 {
            debug!(removed, remaining = self.limiters.len(), "idle clients removed");
        }
        removed
    }

    /// Number of tracked clients
    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }

    fn limiter_for(&self, key: &K) -> Arc<L> {
        let now = self.clock.now();

        if let Some(entry) = self.limiters.get(key) {
            entry.last_seen_nanos.store(now, Ordering::Relaxed);
            return Arc::clone(&entry.limiter);
        }

        let entry = self
            .limiters
            .entry(key.clone())
            .or_insert_with(|| KeyedEntry {
                limiter: Arc::new((self.factory)()),
                last_seen_nanos: AtomicU64::new(now),
            });
        entry.last_seen_nanos.store(now, Ordering::Relaxed);
        Arc::clone(&entry.limiter)
    }
}

impl<K, C> KeyedLimiter<K, TokenBucket<C>, C>
where
    K: Hash + Eq + Clone,
    C: Clock + Clone + 'static,
{
    /// One token bucket per client, all built from `config` and sharing `clock`
    pub fn token_buckets(config: TokenBucketConfig, clock: C) -> Result<Self, RateLimiterError> {
        config.validate()?;
        let bucket_clock = clock.clone();
        Ok(Self::new(clock, move || {
            TokenBucket::from_validated(config.clone(), bucket_clock.clone())
        }))
    }
}

impl<K, C> KeyedLimiter<K, LeakyBucket<C>, C>
where
    K: Hash + Eq + Clone,
    C: Clock + Clone + 'static,
{
    /// One leaky bucket per client, all built from `config` and sharing `clock`
    pub fn leaky_buckets(config: LeakyBucketConfig, clock: C) -> Result<Self, RateLimiterError> {
        config.validate()?;
        let bucket_clock = clock.clone();
        Ok(Self::new(clock, move || {
            LeakyBucket::from_validated(config.clone(), bucket_clock.clone())
        }))
    }
}

impl<K, L, C> fmt::Debug for KeyedLimiter<K, L, C>
where
    K: Hash + Eq + Clone,
    C: Clock,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedLimiter")
            .field("clients", &self.limiters.len())
            .finish_non_exhaustive()
    }
}
