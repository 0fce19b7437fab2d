//! Row copying between the two stores.
//!
//! # Responsibilities
//! - Copy every row of every replicated entity from one store to the other
//! - Keep going past per-row failures; count and log them
//! - Refuse to run against a disconnected store
//! - Never run two passes at once
//! - Stop once the source is no longer the active store

use arc_swap::ArcSwap;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard};
use tokio::time;
use tracing::Instrument;
use uuid::Uuid;

use crate::failover::Designation;
use crate::health::MonitoredStore;
use crate::observability::metrics;
use crate::store::{EntityKind, StoreConnector, StoreRole};
use crate::sync::status::{SyncDirection, SyncError, SyncReport, SyncState, SyncStatus};

/// Exclusive right to run passes. Several passes may run under one guard.
pub struct PassGuard<'a> {
    _lock: MutexGuard<'a, ()>,
}

pub struct SyncEngine<C> {
    primary: Arc<MonitoredStore<C>>,
    secondary: Arc<MonitoredStore<C>>,
    active: Arc<Designation>,
    entities: Vec<EntityKind>,
    statement_timeout: Duration,
    status: ArcSwap<SyncStatus>,
    pass: Mutex<()>,
    stopping: AtomicBool,
}

impl<C: StoreConnector> SyncEngine<C> {
    pub fn new(
        primary: Arc<MonitoredStore<C>>,
        secondary: Arc<MonitoredStore<C>>,
        active: Arc<Designation>,
        entities: Vec<EntityKind>,
        statement_timeout: Duration,
    ) -> Self {
        Self {
            primary,
            secondary,
            active,
            entities,
            statement_timeout,
            status: ArcSwap::from_pointee(SyncStatus::default()),
            pass: Mutex::new(()),
            stopping: AtomicBool::new(false),
        }
    }

    pub fn status(&self) -> Arc<SyncStatus> {
        self.status.load_full()
    }

    pub fn is_running(&self) -> bool {
        self.pass.try_lock().is_err()
    }

    /// Stop the current pass at the next entity boundary and refuse new ones.
    pub fn request_stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    /// Record a reverse sync before failback that never completed.
    pub fn record_failback_failure(&self, message: String) {
        self.update_status(|status| {
            status.status = SyncState::Error;
            status.error = Some(message.clone());
            status.failback_error = Some(message);
        });
    }

    pub fn clear_failback_failure(&self) {
        self.update_status(|status| status.failback_error = None);
    }

    fn update_status(&self, f: impl FnOnce(&mut SyncStatus)) {
        let mut status = (*self.status.load_full()).clone();
        f(&mut status);
        self.status.store(Arc::new(status));
    }

    /// Take the pass lock, or fail if a pass is running.
    pub fn try_begin_pass(&self) -> Result<PassGuard<'_>, SyncError> {
        self.pass
            .try_lock()
            .map(|lock| PassGuard { _lock: lock })
            .map_err(|_| SyncError::InProgress)
    }

    /// Wait for the running pass, if any, then take the pass lock.
    pub async fn begin_pass(&self) -> PassGuard<'_> {
        PassGuard {
            _lock: self.pass.lock().await,
        }
    }

    /// Copy every replicated entity from `from` to the other store.
    pub async fn sync_from(&self, from: StoreRole) -> Result<SyncReport, SyncError> {
        let pass = self.try_begin_pass()?;
        self.run_pass(&pass, from).await
    }

    /// One pass under a pass lock the caller already holds.
    pub async fn run_pass(&self, _pass: &PassGuard<'_>, from: StoreRole) -> Result<SyncReport, SyncError> {
        if self.stopping.load(Ordering::SeqCst) {
            return Err(SyncError::Stopping);
        }

        let direction = SyncDirection::from_store(from);
        let source = self.store(direction.from);
        let target = self.store(direction.to);
        for store in [source, target] {
            if !store.is_connected() {
                tracing::info!(store = %store.role(), "Skipping sync: store not connected");
                return Err(SyncError::StoreUnavailable(store.role()));
            }
        }

        let pass_id = Uuid::new_v4();
        let span = tracing::info_span!("sync_pass", %pass_id, direction = %direction);
        let report = self
            .copy_entities(pass_id, direction, source, target)
            .instrument(span)
            .await;
        Ok(report)
    }

    fn store(&self, role: StoreRole) -> &MonitoredStore<C> {
        match role {
            StoreRole::Primary => &self.primary,
            StoreRole::Secondary => &self.secondary,
        }
    }

    fn superseded(&self, direction: SyncDirection) -> bool {
        self.active.load() != direction.from
    }

    async fn copy_entities(
        &self,
        pass_id: Uuid,
        direction: SyncDirection,
        source: &MonitoredStore<C>,
        target: &MonitoredStore<C>,
    ) -> SyncReport {
        let started = Instant::now();
        let started_at = Utc::now();

        self.update_status(|status| {
            status.status = SyncState::Syncing;
            status.direction = Some(direction);
        });
        tracing::info!(entities = self.entities.len(), "Sync pass started");

        let mut report = SyncReport {
            pass_id,
            direction,
            rows_synced: 0,
            rows_failed: 0,
            entities_failed: Vec::new(),
            started_at,
            duration_ms: 0,
            first_error: None,
            interrupted: false,
            superseded: false,
        };

        for &kind in &self.entities {
            if self.stopping.load(Ordering::SeqCst) {
                tracing::warn!(entity = %kind, "Sync pass interrupted by shutdown");
                report.interrupted = true;
                break;
            }
            self.sync_entity(kind, source, target, &mut report).await;
            if report.superseded {
                break;
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        metrics::record_sync_pass(report.rows_synced, report.rows_failed, started.elapsed());

        let error = if report.is_clean() {
            tracing::info!(
                rows_synced = report.rows_synced,
                duration_ms = report.duration_ms,
                "Sync pass completed"
            );
            None
        } else {
            let message = describe_failure(&report);
            tracing::error!(
                rows_synced = report.rows_synced,
                rows_failed = report.rows_failed,
                error = %message,
                "Sync pass completed with errors"
            );
            Some(message)
        };

        self.update_status(|status| {
            status.last_sync = Some(Utc::now());
            status.records_synced = report.rows_synced;
            status.rows_failed = report.rows_failed;
            status.status = if error.is_some() { SyncState::Error } else { SyncState::Healthy };
            status.error = error;
            status.direction = Some(direction);
        });

        report
    }

    async fn sync_entity(
        &self,
        kind: EntityKind,
        source: &MonitoredStore<C>,
        target: &MonitoredStore<C>,
        report: &mut SyncReport,
    ) {
        let rows = match time::timeout(self.statement_timeout, source.connector().fetch_all(kind)).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) => {
                tracing::warn!(entity = %kind, error = %e, "Failed to read entity from source");
                report.entities_failed.push(kind);
                report.first_error.get_or_insert_with(|| format!("{kind}: {e}"));
                return;
            }
            Err(_) => {
                tracing::warn!(entity = %kind, "Timed out reading entity from source");
                report.entities_failed.push(kind);
                report.first_error.get_or_insert_with(|| format!("{kind}: read timed out"));
                return;
            }
        };

        let mut synced = 0u64;
        for row in &rows {
            if self.superseded(report.direction) {
                tracing::warn!(
                    entity = %kind,
                    key = row.id(),
                    active = %self.active.load(),
                    "Sync pass stopped: source is no longer the active store"
                );
                report.superseded = true;
                break;
            }
            match time::timeout(self.statement_timeout, target.connector().upsert(row)).await {
                Ok(Ok(())) => synced += 1,
                Ok(Err(e)) => {
                    tracing::warn!(entity = %kind, key = row.id(), error = %e, "Failed to sync row");
                    report.rows_failed += 1;
                    report.first_error.get_or_insert_with(|| format!("{kind} id={}: {e}", row.id()));
                }
                Err(_) => {
                    tracing::warn!(entity = %kind, key = row.id(), "Timed out syncing row");
                    report.rows_failed += 1;
                    report
                        .first_error
                        .get_or_insert_with(|| format!("{kind} id={}: upsert timed out", row.id()));
                }
            }
        }
        report.rows_synced += synced;

        if synced > 0 {
            match time::timeout(self.statement_timeout, target.connector().reseed_keys(kind)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::debug!(entity = %kind, error = %e, "Key reseed failed"),
                Err(_) => tracing::debug!(entity = %kind, "Key reseed timed out"),
            }
        }

        tracing::debug!(entity = %kind, rows = rows.len(), synced, "Entity synced");
    }
}

fn describe_failure(report: &SyncReport) -> String {
    let mut parts = Vec::new();
    if report.rows_failed > 0 {
        parts.push(format!("{} rows failed", report.rows_failed));
    }
    if !report.entities_failed.is_empty() {
        parts.push(format!("{} entities unreadable", report.entities_failed.len()));
    }
    if report.interrupted {
        parts.push("interrupted by shutdown".to_string());
    }
    if report.superseded {
        parts.push(format!("stopped: {} is no longer the active store", report.direction.from));
    }
    let mut message = parts.join(", ");
    if let Some(first) = &report.first_error {
        message.push_str(&format!(" (first: {first})"));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthMonitor;
    use crate::store::entities::{AppConfig, Referral};
    use crate::store::{MemoryStore, Record};

    struct Fixture {
        primary: Arc<MemoryStore>,
        secondary: Arc<MemoryStore>,
        monitor: HealthMonitor<MemoryStore>,
        active: Arc<Designation>,
        engine: Arc<SyncEngine<MemoryStore>>,
    }

    fn fixture() -> Fixture {
        let primary = Arc::new(MemoryStore::new("primary"));
        let secondary = Arc::new(MemoryStore::new("secondary"));
        let p = Arc::new(MonitoredStore::new(StoreRole::Primary, primary.clone()));
        let s = Arc::new(MonitoredStore::new(StoreRole::Secondary, secondary.clone()));
        let monitor = HealthMonitor::new(vec![p.clone(), s.clone()], Duration::from_secs(1));
        let active = Arc::new(Designation::new(StoreRole::Primary));
        let engine = Arc::new(SyncEngine::new(
            p,
            s,
            active.clone(),
            EntityKind::ALL.to_vec(),
            Duration::from_secs(5),
        ));
        Fixture { primary, secondary, monitor, active, engine }
    }

    fn setting(id: i32, value: &str) -> Record {
        AppConfig {
            id,
            key: format!("k{id}"),
            value: value.into(),
            created_at: None,
            updated_at: None,
        }
        .into()
    }

    fn referral(id: i32) -> Record {
        Referral {
            id,
            referral_code: format!("REF{id}"),
            wallet_address: format!("0x{id:040x}"),
            email: None,
            total_rewards: Some("12.50".into()),
            created_at: None,
            updated_at: None,
        }
        .into()
    }

    #[tokio::test]
    async fn test_rows_are_copied_to_the_other_store() {
        let f = fixture();
        f.primary.insert(setting(1, "on"));
        f.primary.insert(referral(9));
        f.secondary.insert(setting(1, "stale"));
        f.monitor.probe_all().await;

        let report = f.engine.sync_from(StoreRole::Primary).await.unwrap();

        assert!(report.is_clean());
        assert_eq!(report.rows_synced, 2);
        assert_eq!(f.secondary.get(EntityKind::AppConfig, 1), Some(setting(1, "on")));
        assert_eq!(f.secondary.get(EntityKind::Referral, 9), Some(referral(9)));

        let status = f.engine.status();
        assert_eq!(status.status, SyncState::Healthy);
        assert_eq!(status.records_synced, 2);
        assert!(status.last_sync.is_some());
        assert_eq!(status.direction, Some(SyncDirection::from_store(StoreRole::Primary)));
    }

    #[tokio::test]
    async fn test_row_failures_do_not_abort_the_pass() {
        let f = fixture();
        for id in 1..=4 {
            f.primary.insert(setting(id, "v"));
        }
        f.primary.insert(referral(1));
        f.secondary.reject_row(EntityKind::AppConfig, 2);
        f.monitor.probe_all().await;

        let report = f.engine.sync_from(StoreRole::Primary).await.unwrap();

        assert_eq!(report.rows_synced, 4);
        assert_eq!(report.rows_failed, 1);
        assert!(f.secondary.get(EntityKind::Referral, 1).is_some());
        assert!(f.secondary.get(EntityKind::AppConfig, 2).is_none());

        let status = f.engine.status();
        assert_eq!(status.status, SyncState::Error);
        assert_eq!(status.records_synced, 4);
        assert!(status.error.as_deref().unwrap().contains("app_config id=2"));
    }

    #[tokio::test]
    async fn test_refuses_disconnected_store() {
        let f = fixture();
        f.secondary.set_reachable(false);
        f.monitor.probe_all().await;

        let err = f.engine.sync_from(StoreRole::Primary).await.unwrap_err();
        assert_eq!(err, SyncError::StoreUnavailable(StoreRole::Secondary));
        assert_eq!(f.engine.status().status, SyncState::Unknown);
        assert!(f.engine.status().last_sync.is_none());
    }

    #[tokio::test]
    async fn test_never_synced_store_counts_as_disconnected() {
        let f = fixture();
        let err = f.engine.sync_from(StoreRole::Primary).await.unwrap_err();
        assert_eq!(err, SyncError::StoreUnavailable(StoreRole::Primary));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_pass_is_rejected() {
        let f = fixture();
        f.primary.insert(setting(1, "v"));
        f.secondary.set_upsert_delay(Duration::from_secs(2));
        f.monitor.probe_all().await;

        let engine = f.engine.clone();
        let first = tokio::spawn(async move { engine.sync_from(StoreRole::Primary).await });
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(f.engine.is_running());
        assert_eq!(f.engine.status().status, SyncState::Syncing);
        assert_eq!(
            f.engine.sync_from(StoreRole::Primary).await.unwrap_err(),
            SyncError::InProgress
        );

        let report = first.await.unwrap().unwrap();
        assert_eq!(report.rows_synced, 1);
        assert!(!f.engine.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_row_timeout_counts_as_failure() {
        let f = fixture();
        f.primary.insert(setting(1, "v"));
        f.secondary.set_upsert_delay(Duration::from_secs(30));
        f.monitor.probe_all().await;

        let report = f.engine.sync_from(StoreRole::Primary).await.unwrap();
        assert_eq!(report.rows_failed, 1);
        assert!(report.first_error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_stop_request_refuses_new_passes() {
        let f = fixture();
        f.monitor.probe_all().await;
        f.engine.request_stop();
        assert_eq!(
            f.engine.sync_from(StoreRole::Primary).await.unwrap_err(),
            SyncError::Stopping
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_pass_stops_when_source_loses_designation() {
        let f = fixture();
        for id in 1..=5 {
            f.primary.insert(setting(id, "v"));
        }
        f.secondary.set_upsert_delay(Duration::from_secs(1));
        f.monitor.probe_all().await;

        let engine = f.engine.clone();
        let pass = tokio::spawn(async move { engine.sync_from(StoreRole::Primary).await });
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        f.active.swap(StoreRole::Secondary);

        let report = pass.await.unwrap().unwrap();
        assert!(report.superseded);
        assert!(!report.is_clean());
        assert_eq!(report.rows_synced, 2);
        assert!(f.secondary.get(EntityKind::AppConfig, 3).is_none());

        let status = f.engine.status();
        assert_eq!(status.status, SyncState::Error);
        assert!(status.error.as_deref().unwrap().contains("no longer the active store"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_begin_pass_waits_for_running_pass() {
        let f = fixture();
        f.primary.insert(setting(1, "v"));
        f.secondary.set_upsert_delay(Duration::from_secs(2));
        f.monitor.probe_all().await;

        let engine = f.engine.clone();
        let first = tokio::spawn(async move { engine.sync_from(StoreRole::Primary).await });
        tokio::time::sleep(Duration::from_millis(100)).await;

        let pass = f.engine.begin_pass().await;
        assert_eq!(f.engine.status().status, SyncState::Healthy);
        assert_eq!(f.engine.status().records_synced, 1);
        assert_eq!(
            f.engine.sync_from(StoreRole::Primary).await.unwrap_err(),
            SyncError::InProgress
        );
        f.engine.run_pass(&pass, StoreRole::Primary).await.unwrap();
        drop(pass);
        assert_eq!(first.await.unwrap().unwrap().rows_synced, 1);
    }

    #[tokio::test]
    async fn test_failback_failure_survives_later_passes() {
        let f = fixture();
        f.primary.insert(setting(1, "v"));
        f.monitor.probe_all().await;

        f.engine.record_failback_failure("reverse sync before failback failed: boom".into());
        f.engine.sync_from(StoreRole::Primary).await.unwrap();

        let status = f.engine.status();
        assert_eq!(status.status, SyncState::Healthy);
        assert!(status.error.is_none());
        assert!(status.failback_error.as_deref().unwrap().contains("boom"));

        f.engine.clear_failback_failure();
        assert!(f.engine.status().failback_error.is_none());
    }
}
