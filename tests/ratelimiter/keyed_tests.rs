// tests/ratelimiter/keyed_tests.rs

#[cfg(test)]
mod tests {
    use crate::TestClock;
    use bucket_limiter::{
        KeyedLimiter, LeakyBucket, LeakyBucketConfig, RateLimiterError, TokenBucket,
        TokenBucketConfig,
    };
    use std::future;
    use std::sync::Arc;
    use std::time::Duration;

    fn keyed_tokens(clock: &TestClock) -> KeyedLimiter<String, TokenBucket<TestClock>, TestClock> {
        KeyedLimiter::token_buckets(TokenBucketConfig::new(1, 1.0), clock.clone()).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let result = KeyedLimiter::<u64, _, _>::token_buckets(
            TokenBucketConfig::new(1, 0.0),
            TestClock::new(0.0),
        );
        assert_eq!(result.unwrap_err(), RateLimiterError::InvalidRate);

        let result = KeyedLimiter::<u64, _, _>::leaky_buckets(
            LeakyBucketConfig::new(0, Duration::from_secs(1)),
            TestClock::new(0.0),
        );
        assert_eq!(result.unwrap_err(), RateLimiterError::InvalidCapacity);
    }

    #[test]
    fn multiple_clients_independent() {
        let clock = TestClock::new(0.0);
        let limiter = keyed_tokens(&clock);
        let (client1, client2) = ("client1".to_string(), "client2".to_string());

        assert!(limiter.allow(&client1));
        assert!(limiter.allow(&client2));

        assert!(!limiter.allow(&client1));
        assert!(!limiter.allow(&client2));

        clock.set_time(1.0);
        assert!(limiter.allow(&client1));

        // client3 is new, so it starts with a full bucket
        assert!(limiter.allow(&"client3".to_string()));
        assert_eq!(limiter.len(), 3);
    }

    #[test]
    fn leaky_buckets_per_client() {
        let clock = TestClock::new(0.0);
        let limiter = KeyedLimiter::leaky_buckets(
            LeakyBucketConfig::new(2, Duration::from_secs(1)),
            clock.clone(),
        )
        .unwrap();

        assert!(limiter.allow(&1_u32));
        assert!(limiter.allow(&1_u32));
        assert!(!limiter.allow(&1_u32));
        assert!(limiter.allow(&2_u32));
    }

    #[test]
    fn custom_factory_is_used_per_client() {
        let clock = TestClock::new(0.0);
        let bucket_clock = clock.clone();
        let limiter = KeyedLimiter::new(clock.clone(), move || {
            LeakyBucket::with_config(
                LeakyBucketConfig::new(1, Duration::from_secs(1)),
                bucket_clock.clone(),
            )
            .unwrap()
        });

        assert!(limiter.is_empty());
        assert!(limiter.allow(&"a"));
        assert!(!limiter.allow(&"a"));
        assert!(limiter.allow(&"b"));
        assert_eq!(limiter.len(), 2);
    }

    #[test]
    fn cleanup_removes_idle_clients() {
        let clock = TestClock::new(0.0);
        let limiter = keyed_tokens(&clock);

        limiter.allow(&"client1".to_string());
        clock.set_time(5.0);
        limiter.allow(&"client2".to_string());
        clock.set_time(10.0);
        limiter.allow(&"client3".to_string());
        assert_eq!(limiter.len(), 3);

        // at t=12 with a 4.5s threshold only client3 (seen at t=10) is recent
        clock.set_time(12.0);
        let removed = limiter.cleanup_idle(Duration::from_secs_f64(4.5));

        assert_eq!(removed, 2);
        assert_eq!(limiter.len(), 1);

        assert_eq!(limiter.cleanup_idle(Duration::ZERO), 1);
        assert!(limiter.is_empty());
    }

    #[test]
    fn cleanup_handles_empty_state() {
        let limiter = keyed_tokens(&TestClock::new(0.0));
        assert_eq!(limiter.cleanup_idle(Duration::from_secs(1)), 0);
        assert!(limiter.is_empty());
    }

    #[test]
    fn access_refreshes_idle_timer() {
        let clock = TestClock::new(100.0);
        let limiter = keyed_tokens(&clock);
        let client = "client".to_string();

        for _ in 0..5 {
            limiter.allow(&client);
            clock.advance(1.0);
        }

        // last seen 1s ago
        assert_eq!(limiter.cleanup_idle(Duration::from_secs(2)), 0);
        assert_eq!(limiter.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn client_with_pending_wait_survives_cleanup() {
        let clock = TestClock::new(0.0);
        let limiter = Arc::new(keyed_tokens(&clock));
        let client = "busy".to_string();
        assert!(limiter.allow(&client));

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let waiter = {
            let limiter = Arc::clone(&limiter);
            let client = client.clone();
            tokio::spawn(async move { limiter.wait(&client, rx).await })
        };
        // let the waiter reach its sleep
        tokio::time::sleep(Duration::from_millis(1)).await;

        clock.advance(0.5);
        assert_eq!(limiter.cleanup_idle(Duration::ZERO), 0);
        assert_eq!(limiter.len(), 1);

        tx.send(()).unwrap();
        assert_eq!(waiter.await.unwrap(), Err(RateLimiterError::Cancelled));
        assert_eq!(limiter.cleanup_idle(Duration::ZERO), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_admits_client_with_budget() {
        let limiter = keyed_tokens(&TestClock::new(0.0));
        let result = limiter.wait(&"fresh".to_string(), future::pending::<()>()).await;
        assert_eq!(result, Ok(()));
    }
}
