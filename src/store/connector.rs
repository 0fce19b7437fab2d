//! The seam between the redundancy core and a concrete store.

use futures_util::future::BoxFuture;

use crate::store::entities::{EntityKind, Record};
use crate::store::StoreError;

/// Result type for connector operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A handle that can run queries against one relational store.
///
/// Implementations must be cheap to share behind an `Arc`; the health
/// monitor, the sync engine and application code all hold the same handle.
/// None of these calls carry their own timeout: callers wrap them.
pub trait StoreConnector: Send + Sync + 'static {
    /// Label used in logs and metrics.
    fn name(&self) -> &str;

    /// Trivial round-trip used as a health probe.
    fn ping(&self) -> BoxFuture<'_, StoreResult<()>>;

    /// Read every row of one replicated entity, ordered by primary key.
    fn fetch_all(&self, kind: EntityKind) -> BoxFuture<'_, StoreResult<Vec<Record>>>;

    /// Insert the record, or overwrite every column of the row with the same key.
    fn upsert<'a>(&'a self, record: &'a Record) -> BoxFuture<'a, StoreResult<()>>;

    /// Realign the key generator of `kind` with the highest stored key.
    fn reseed_keys(&self, _kind: EntityKind) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async { Ok(()) })
    }

    /// Release pooled connections. Later calls fail with [`StoreError::Closed`].
    fn close(&self) -> BoxFuture<'_, ()>;
}
