//! Active health checking.
//!
//! # Responsibilities
//! - Probe each configured store with a bounded `SELECT 1`
//! - Update the store's health record from the outcome
//!
//! Probe failures are data, never errors: `probe` always returns a record.

use chrono::Utc;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time;

use crate::health::record::{HealthRecord, MonitoredStore};
use crate::observability::metrics;
use crate::store::StoreConnector;

pub struct HealthMonitor<C> {
    stores: Vec<Arc<MonitoredStore<C>>>,
    timeout: Duration,
}

impl<C: StoreConnector> HealthMonitor<C> {
    /// Monitor the given stores. In single-store mode only the primary is passed.
    pub fn new(stores: Vec<Arc<MonitoredStore<C>>>, timeout: Duration) -> Self {
        Self { stores, timeout }
    }

    /// Probe every store concurrently; a hung store does not delay the others.
    pub async fn probe_all(&self) -> Vec<HealthRecord> {
        join_all(self.stores.iter().map(|store| self.probe(store))).await
    }

    /// Probe one store and publish the new record.
    pub async fn probe(&self, store: &MonitoredStore<C>) -> HealthRecord {
        let started = Instant::now();
        let outcome = time::timeout(self.timeout, store.connector().ping()).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let previous = store.health();
        let record = match outcome {
            Ok(Ok(())) => previous.after_success(latency_ms, Utc::now()),
            Ok(Err(e)) => {
                tracing::warn!(
                    store = %store.role(),
                    error = %e,
                    consecutive_failures = previous.consecutive_failures + 1,
                    "Health check failed"
                );
                previous.after_failure(latency_ms, Utc::now())
            }
            Err(_) => {
                tracing::warn!(
                    store = %store.role(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    consecutive_failures = previous.consecutive_failures + 1,
                    "Health check failed: timeout"
                );
                previous.after_failure(latency_ms, Utc::now())
            }
        };

        if record.connected && !previous.connected {
            tracing::info!(store = %store.role(), latency_ms, "Store reachable");
        }

        metrics::record_store_health(store.role(), record.connected, record.latency_ms);
        store.publish(record.clone());
        record
    }
}
