//! Periodic background tasks.
//!
//! # Design Decisions
//! - First tick fires one period after start, not immediately
//! - A slow tick delays the next one; ticks never overlap or burst
//! - Shutdown is observed between ticks; a running tick completes

use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Run `work` every `period` until a shutdown signal arrives.
pub fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
    mut work: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(task = name, period_ms = period.as_millis() as u64, "Periodic task started");

        loop {
            tokio::select! {
                _ = ticker.tick() => work().await,
                _ = shutdown.recv() => {
                    tracing::debug!(task = name, "Periodic task stopping");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period_and_stops_on_shutdown() {
        let shutdown = Shutdown::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let handle = spawn_periodic("test", Duration::from_secs(10), shutdown.subscribe(), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_secs(26)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        shutdown.trigger();
        handle.await.unwrap();
        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_tick_does_not_overlap() {
        let shutdown = Shutdown::new();
        let running = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));
        let (r, o) = (running.clone(), overlaps.clone());
        let _handle = spawn_periodic("slow", Duration::from_secs(1), shutdown.subscribe(), move || {
            let (r, o) = (r.clone(), o.clone());
            async move {
                if r.fetch_add(1, Ordering::SeqCst) > 0 {
                    o.fetch_add(1, Ordering::SeqCst);
                }
                time::sleep(Duration::from_secs(3)).await;
                r.fetch_sub(1, Ordering::SeqCst);
            }
        });

        time::sleep(Duration::from_secs(20)).await;
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
        shutdown.trigger();
    }
}
