// src/throttle.rs

// paces a channel of items to at most one per period

// dependencies
use crate::errors::RateLimiterError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

/// Forward items from `input` no more often than once per `period`.
///
/// The first item is released one period after the call, later items one period
/// apart (or later, if the consumer or producer is slower). The returned receiver
/// closes once `input` is closed and drained, or as soon as `cancel` completes.
/// Dropping the returned receiver stops forwarding and releases `input`.
///
/// Must be called from within a tokio runtime: forwarding runs on a spawned task.
pub fn throttle<T, F>(
    mut input: mpsc::Receiver<T>,
    period: Duration,
    cancel: F,
) -> Result<mpsc::Receiver<T>, RateLimiterError>
where
    T: Send + 'static,
    F: Future + Send + 'static,
{
    if period.is_zero() {
        return Err(RateLimiterError::InvalidInterval);
    }

    let (tx, rx) = mpsc::channel(1);

    tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(cancel);

        loop {
            let item = tokio::select! {
                biased;
                _ = &mut cancel => {
                    debug!("throttle cancelled, closing output");
                    return;
                }
                _ = tx.closed() => {
                    debug!("throttle receiver dropped, stopping");
                    return;
                }
                item = input.recv() => match item {
                    Some(item) => item,
                    None => return,
                },
            };

            tokio::select! {
                biased;
                _ = &mut cancel => {
                    debug!("throttle cancelled, closing output");
                    return;
                }
                _ = tx.closed() => {
                    debug!("throttle receiver dropped, stopping");
                    return;
                }
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = &mut cancel => {
                    debug!("throttle cancelled, closing output");
                    return;
                }
                sent = tx.send(item) => {
                    if sent.is_err() {
                        debug!("throttle receiver dropped, stopping");
                        return;
                    }
                }
            }
        }
    });

    Ok(rx)
}
