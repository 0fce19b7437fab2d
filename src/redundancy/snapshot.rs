//! Aggregate health view.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::health::HealthRecord;
use crate::store::StoreRole;
use crate::sync::SyncStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every configured store is connected.
    Healthy,
    /// Some, but not all, configured stores are connected.
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn from_records(primary: &HealthRecord, secondary: Option<&HealthRecord>) -> Self {
        let configured = 1 + usize::from(secondary.is_some());
        let connected = usize::from(primary.connected)
            + usize::from(secondary.map(|s| s.connected).unwrap_or(false));
        match connected {
            0 => HealthStatus::Unhealthy,
            n if n == configured => HealthStatus::Healthy,
            _ => HealthStatus::Degraded,
        }
    }
}

/// Point-in-time view of the redundancy layer. Built from published
/// snapshots; never waits on a probe or a sync pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub status: HealthStatus,
    pub redundancy_enabled: bool,
    pub active_store: StoreRole,
    pub both_stores_degraded: bool,
    pub last_switch: Option<DateTime<Utc>>,
    pub transitions: u64,
    pub primary: HealthRecord,
    pub secondary: Option<HealthRecord>,
    pub sync_status: SyncStatus,
}
