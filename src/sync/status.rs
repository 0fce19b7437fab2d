//! Sync status and pass reports.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::store::{EntityKind, StoreRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// No pass has finished since startup.
    Unknown,
    Healthy,
    Syncing,
    Error,
}

/// Source and target of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncDirection {
    pub from: StoreRole,
    pub to: StoreRole,
}

impl SyncDirection {
    pub fn from_store(from: StoreRole) -> Self {
        Self { from, to: from.other() }
    }
}

impl std::fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Outcome of the most recent pass, as exposed by the health API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub last_sync: Option<DateTime<Utc>>,
    /// Rows successfully copied by the last pass.
    pub records_synced: u64,
    pub rows_failed: u64,
    pub status: SyncState,
    pub error: Option<String>,
    pub direction: Option<SyncDirection>,
    /// Last reverse sync before a failback that never completed. Survives
    /// later passes; cleared by the next reverse sync that succeeds.
    pub failback_error: Option<String>,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            last_sync: None,
            records_synced: 0,
            rows_failed: 0,
            status: SyncState::Unknown,
            error: None,
            direction: None,
            failback_error: None,
        }
    }
}

/// What one pass did.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub pass_id: Uuid,
    pub direction: SyncDirection,
    pub rows_synced: u64,
    pub rows_failed: u64,
    /// Entities whose rows could not be read from the source.
    pub entities_failed: Vec<EntityKind>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub first_error: Option<String>,
    /// The pass stopped early because the service is shutting down.
    pub interrupted: bool,
    /// The pass stopped early because its source stopped being the active store.
    pub superseded: bool,
}

impl SyncReport {
    /// Every row of every entity was copied.
    pub fn is_clean(&self) -> bool {
        self.rows_failed == 0
            && self.entities_failed.is_empty()
            && !self.interrupted
            && !self.superseded
    }
}

/// Reasons a pass did not run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("sync already in progress")]
    InProgress,

    #[error("{0} store is not connected")]
    StoreUnavailable(StoreRole),

    #[error("sync engine is stopping")]
    Stopping,
}
