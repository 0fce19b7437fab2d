//! Per-store health record.
//!
//! # States
//! - connected: last probe succeeded
//! - disconnected: last probe failed or no probe yet
//!
//! # Counters
//! ```text
//! success → consecutive_successes += 1, consecutive_failures = 0
//! failure → consecutive_failures += 1, consecutive_successes = 0
//! ```
//! At most one of the two counters is non-zero at any time.

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::store::{StoreConnector, StoreRole};

/// Rolling health of one store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecord {
    pub connected: bool,
    pub latency_ms: u64,
    pub last_check: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
}

impl HealthRecord {
    /// The record a store starts with: unknown, treated as unhealthy.
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn after_success(&self, latency_ms: u64, at: DateTime<Utc>) -> Self {
        Self {
            connected: true,
            latency_ms,
            last_check: Some(at),
            consecutive_failures: 0,
            consecutive_successes: self.consecutive_successes.saturating_add(1),
        }
    }

    pub fn after_failure(&self, latency_ms: u64, at: DateTime<Utc>) -> Self {
        Self {
            connected: false,
            latency_ms,
            last_check: Some(at),
            consecutive_failures: self.consecutive_failures.saturating_add(1),
            consecutive_successes: 0,
        }
    }
}

/// A connector together with the health the monitor has observed for it.
///
/// The health record is published through an `ArcSwap`: the monitor is the
/// only writer, readers take a snapshot without waiting on a probe.
pub struct MonitoredStore<C> {
    role: StoreRole,
    connector: Arc<C>,
    health: ArcSwap<HealthRecord>,
    ever_connected: AtomicBool,
}

impl<C: StoreConnector> MonitoredStore<C> {
    pub fn new(role: StoreRole, connector: Arc<C>) -> Self {
        Self {
            role,
            connector,
            health: ArcSwap::from_pointee(HealthRecord::unknown()),
            ever_connected: AtomicBool::new(false),
        }
    }

    pub fn role(&self) -> StoreRole {
        self.role
    }

    pub fn connector(&self) -> &Arc<C> {
        &self.connector
    }

    /// Snapshot of the latest record.
    pub fn health(&self) -> Arc<HealthRecord> {
        self.health.load_full()
    }

    pub fn is_connected(&self) -> bool {
        self.health.load().connected
    }

    /// Whether any probe of this store has ever succeeded.
    pub fn ever_connected(&self) -> bool {
        self.ever_connected.load(Ordering::Acquire)
    }

    pub(crate) fn publish(&self, record: HealthRecord) {
        if record.connected {
            self.ever_connected.store(true, Ordering::Release);
        }
        self.health.store(Arc::new(record));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_success_resets_failures() {
        let now = Utc::now();
        let r = HealthRecord::unknown()
            .after_failure(5, now)
            .after_failure(5, now)
            .after_success(3, now);
        assert!(r.connected);
        assert_eq!(r.consecutive_failures, 0);
        assert_eq!(r.consecutive_successes, 1);
        assert_eq!(r.latency_ms, 3);
    }

    #[test]
    fn test_counters_are_never_both_non_zero() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut record = HealthRecord::unknown();
        for _ in 0..10_000 {
            record = if rng.gen_bool(0.5) {
                record.after_success(1, Utc::now())
            } else {
                record.after_failure(1, Utc::now())
            };
            assert!(record.consecutive_failures == 0 || record.consecutive_successes == 0);
            assert_eq!(record.connected, record.consecutive_successes > 0);
        }
    }
}
