//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::store::EntityKind;

/// Root configuration for the redundancy service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Admin API listener.
    pub listener: ListenerConfig,

    /// Connection settings for both stores.
    pub stores: StoreConfig,

    /// Health check, failover and sync policy.
    pub redundancy: RedundancyConfig,

    /// Which entities are copied between stores.
    pub replication: ReplicationConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds. A forced sync runs inside the request.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 300,
            max_body_bytes: 16 * 1024,
        }
    }
}

/// Store connection settings.
///
/// There are deliberately no default connection strings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Primary store connection string. Required.
    pub primary_url: Option<String>,

    /// Secondary store connection string. Absent means single-store mode.
    pub secondary_url: Option<String>,

    /// Pool size per store.
    pub max_connections: u32,

    /// Time to wait for a pooled connection, in milliseconds.
    pub acquire_timeout_ms: u64,

    /// Idle connections are closed after this many seconds.
    pub idle_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            primary_url: None,
            secondary_url: None,
            max_connections: 10,
            acquire_timeout_ms: 5_000,
            idle_timeout_secs: 600,
        }
    }
}

/// Health check, failover and sync policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedundancyConfig {
    /// Period of the automatic sync pass, in milliseconds.
    pub sync_interval_ms: u64,

    /// Period of the health check, in milliseconds.
    pub health_check_interval_ms: u64,

    /// Consecutive primary failures before failing over.
    pub failover_threshold: u32,

    /// Consecutive primary successes before failing back.
    pub failback_threshold: u32,

    /// Deadline for a single probe, in milliseconds.
    pub probe_timeout_ms: u64,

    /// Deadline for a single sync statement (read or row upsert), in milliseconds.
    pub statement_timeout_ms: u64,

    /// Attempts at the reverse sync that precedes a failback.
    pub failback_sync_attempts: u32,

    /// Base delay between reverse sync attempts, in milliseconds.
    pub failback_sync_backoff_ms: u64,

    /// Cap on the delay between reverse sync attempts, in milliseconds.
    pub failback_sync_backoff_max_ms: u64,

    /// How long shutdown waits for in-flight work, in seconds.
    pub drain_timeout_secs: u64,
}

impl Default for RedundancyConfig {
    fn default() -> Self {
        Self {
            sync_interval_ms: 3_600_000,
            health_check_interval_ms: 300_000,
            failover_threshold: 3,
            failback_threshold: 5,
            probe_timeout_ms: 5_000,
            statement_timeout_ms: 30_000,
            failback_sync_attempts: 3,
            failback_sync_backoff_ms: 1_000,
            failback_sync_backoff_max_ms: 30_000,
            drain_timeout_secs: 30,
        }
    }
}

impl RedundancyConfig {
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_millis(self.statement_timeout_ms)
    }
}

/// Replicated entity selection.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ReplicationConfig {
    /// Table names to replicate. Empty means every replicated entity.
    pub entities: Vec<String>,
}

impl ReplicationConfig {
    /// The configured subset, always in sync order. Unknown names are skipped
    /// here; validation rejects them before this is called.
    pub fn entity_set(&self) -> Vec<EntityKind> {
        if self.entities.is_empty() {
            return EntityKind::ALL.to_vec();
        }
        EntityKind::ALL
            .iter()
            .copied()
            .filter(|k| self.entities.iter().any(|name| name == k.table()))
            .collect()
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    /// Bearer token required on operator actions, when set.
    pub api_key: Option<String>,
}
