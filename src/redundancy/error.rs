use thiserror::Error;

use crate::store::StoreRole;
use crate::sync::SyncError;

/// Failures surfaced to callers of the redundancy manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RedundancyError {
    /// Neither store has answered a probe since startup.
    #[error("no database store has been reachable since startup")]
    NoStoreAvailable,

    #[error("no secondary database configured")]
    NoSecondary,

    /// Another transition holds the transition lock.
    #[error("a failover or failback is already in progress")]
    Busy,

    #[error("sync already in progress")]
    SyncInProgress,

    #[error("{0} store is not connected; sync skipped")]
    StoresUnavailable(StoreRole),

    #[error("redundancy manager is shutting down")]
    ShuttingDown,
}

impl From<SyncError> for RedundancyError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::InProgress => RedundancyError::SyncInProgress,
            SyncError::StoreUnavailable(role) => RedundancyError::StoresUnavailable(role),
            SyncError::Stopping => RedundancyError::ShuttingDown,
        }
    }
}
