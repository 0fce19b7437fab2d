//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

use crate::config::RedundancyConfig;

/// Delay schedule for a bounded number of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub attempts: u32,
    pub base_ms: u64,
    pub max_ms: u64,
}

impl BackoffPolicy {
    /// Schedule for the reverse sync that precedes a failback.
    pub fn failback_sync(config: &RedundancyConfig) -> Self {
        Self {
            attempts: config.failback_sync_attempts,
            base_ms: config.failback_sync_backoff_ms,
            max_ms: config.failback_sync_backoff_max_ms,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        calculate_backoff(retry, self.base_ms, self.max_ms)
    }
}

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // 0 to 10% on top
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        assert_eq!(calculate_backoff(0, 100, 2000), Duration::ZERO);

        let b1 = calculate_backoff(1, 100, 2000);
        assert!(b1.as_millis() >= 100 && b1.as_millis() < 110);

        let b2 = calculate_backoff(2, 100, 2000);
        assert!(b2.as_millis() >= 200);

        let max = calculate_backoff(10, 100, 1000);
        assert!(max.as_millis() >= 1000 && max.as_millis() < 1100);
    }

    #[test]
    fn test_failback_policy_follows_config() {
        let config = RedundancyConfig {
            failback_sync_attempts: 4,
            failback_sync_backoff_ms: 50,
            failback_sync_backoff_max_ms: 120,
            ..RedundancyConfig::default()
        };
        let policy = BackoffPolicy::failback_sync(&config);
        assert_eq!(policy.attempts, 4);
        assert!(policy.delay(3).as_millis() >= 120);
        assert!(policy.delay(3).as_millis() < 132);
    }
}
