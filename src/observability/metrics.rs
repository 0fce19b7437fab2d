//! Metrics collection and exposition.
//!
//! # Metrics
//! - `db_store_up` (gauge): 1 = connected, 0 = disconnected, by store
//! - `db_store_latency_ms` (gauge): last probe latency, by store
//! - `db_active_store` (gauge): 0 = primary, 1 = secondary
//! - `db_transitions_total` (counter): failovers and failbacks, by kind and trigger
//! - `db_sync_rows_total` (counter): rows copied, by result
//! - `db_sync_pass_seconds` (histogram): duration of a sync pass
//! - `db_failback_sync_failures_total` (counter): reverse syncs abandoned before failback
//! - `db_both_degraded` (gauge): 1 while neither store is healthy
//!
//! Recording is a no-op until a recorder is installed, so library code and
//! tests call these freely.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

use crate::store::StoreRole;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_store_health(store: StoreRole, connected: bool, latency_ms: u64) {
    gauge!("db_store_up", "store" => store.as_str()).set(if connected { 1.0 } else { 0.0 });
    gauge!("db_store_latency_ms", "store" => store.as_str()).set(latency_ms as f64);
}

pub fn record_active_store(active: StoreRole) {
    gauge!("db_active_store").set(active as u8 as f64);
}

/// `kind` is "failover" or "failback"; `trigger` is "automatic" or "forced".
pub fn record_transition(kind: &'static str, trigger: &'static str) {
    counter!("db_transitions_total", "kind" => kind, "trigger" => trigger).increment(1);
}

pub fn record_sync_pass(synced: u64, failed: u64, duration: Duration) {
    counter!("db_sync_rows_total", "result" => "synced").increment(synced);
    if failed > 0 {
        counter!("db_sync_rows_total", "result" => "failed").increment(failed);
    }
    histogram!("db_sync_pass_seconds").record(duration.as_secs_f64());
}

pub fn record_failback_sync_failure() {
    counter!("db_failback_sync_failures_total").increment(1);
}

pub fn record_both_degraded(degraded: bool) {
    gauge!("db_both_degraded").set(if degraded { 1.0 } else { 0.0 });
}
