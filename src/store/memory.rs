//! In-process store with fault injection.
//!
//! Behaves like a store with one table per replicated entity. Reachability,
//! latency and per-row failures can be flipped at runtime, which is what the
//! failover and sync tests drive.

use dashmap::{DashMap, DashSet};
use futures_util::future::BoxFuture;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use crate::store::connector::{StoreConnector, StoreResult};
use crate::store::entities::{EntityKind, Record};
use crate::store::StoreError;

/// A store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    name: String,
    tables: DashMap<EntityKind, BTreeMap<i32, Record>>,
    unreachable: AtomicBool,
    closed: AtomicBool,
    /// Added to every call, in milliseconds.
    latency_ms: AtomicU64,
    /// Added to every upsert, in milliseconds.
    upsert_delay_ms: AtomicU64,
    rejected: DashSet<(EntityKind, i32)>,
    pings: AtomicUsize,
    upserts: AtomicUsize,
}

impl MemoryStore {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Toggle whether calls reach the store.
    pub fn set_reachable(&self, reachable: bool) {
        self.unreachable.store(!reachable, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms.store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_upsert_delay(&self, delay: Duration) {
        self.upsert_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Make upserts of this row fail with a query error.
    pub fn reject_row(&self, kind: EntityKind, id: i32) {
        self.rejected.insert((kind, id));
    }

    /// Write a row directly, bypassing fault injection.
    pub fn insert(&self, record: Record) {
        self.tables
            .entry(record.kind())
            .or_default()
            .insert(record.id(), record);
    }

    pub fn get(&self, kind: EntityKind, id: i32) -> Option<Record> {
        self.tables.get(&kind).and_then(|t| t.get(&id).cloned())
    }

    pub fn row_count(&self, kind: EntityKind) -> usize {
        self.tables.get(&kind).map(|t| t.len()).unwrap_or(0)
    }

    pub fn ping_count(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> StoreResult<()> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::Connection(format!("{} is unreachable", self.name)));
        }
        Ok(())
    }
}

impl StoreConnector for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn ping(&self) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            self.pings.fetch_add(1, Ordering::SeqCst);
            self.enter().await
        })
    }

    fn fetch_all(&self, kind: EntityKind) -> BoxFuture<'_, StoreResult<Vec<Record>>> {
        Box::pin(async move {
            self.enter().await?;
            Ok(self
                .tables
                .get(&kind)
                .map(|t| t.values().cloned().collect::<Vec<_>>())
                .unwrap_or_default())
        })
    }

    fn upsert<'a>(&'a self, record: &'a Record) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            self.enter().await?;
            let delay = self.upsert_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if self.rejected.contains(&(record.kind(), record.id())) {
                return Err(StoreError::Query(format!(
                    "constraint violation on {} id={}",
                    record.kind(),
                    record.id()
                )));
            }
            self.upserts.fetch_add(1, Ordering::SeqCst);
            self.insert(record.clone());
            Ok(())
        })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.closed.store(true, Ordering::SeqCst);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::entities::AppConfig;

    fn setting(id: i32, value: &str) -> Record {
        AppConfig {
            id,
            key: format!("k{id}"),
            value: value.to_string(),
            created_at: None,
            updated_at: None,
        }
        .into()
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_key() {
        let store = MemoryStore::new("m");
        store.upsert(&setting(1, "a")).await.unwrap();
        store.upsert(&setting(1, "b")).await.unwrap();
        assert_eq!(store.row_count(EntityKind::AppConfig), 1);
        assert_eq!(store.get(EntityKind::AppConfig, 1), Some(setting(1, "b")));
    }

    #[tokio::test]
    async fn test_fetch_all_is_ordered_by_key() {
        let store = MemoryStore::new("m");
        store.insert(setting(3, "c"));
        store.insert(setting(1, "a"));
        let rows = store.fetch_all(EntityKind::AppConfig).await.unwrap();
        let ids: Vec<_> = rows.iter().map(Record::id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_faults() {
        let store = MemoryStore::new("m");
        store.set_reachable(false);
        assert!(matches!(store.ping().await, Err(StoreError::Connection(_))));
        store.set_reachable(true);
        store.ping().await.unwrap();

        store.reject_row(EntityKind::AppConfig, 2);
        assert!(matches!(store.upsert(&setting(2, "x")).await, Err(StoreError::Query(_))));

        store.close().await;
        assert!(matches!(store.ping().await, Err(StoreError::Closed)));
        assert_eq!(store.ping_count(), 3);
    }
}
