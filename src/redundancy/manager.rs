//! The redundancy manager.
//!
//! # Responsibilities
//! - Own both monitored stores, the failover state machine and the sync engine
//! - Run the health and sync timers
//! - Hand out the active connector
//! - Execute operator actions
//! - Release everything on shutdown

use futures_util::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::RedundancyConfig;
use crate::failover::{Decision, FailoverStateMachine, Thresholds, TransitionOutcome, Trigger};
use crate::health::{HealthMonitor, MonitoredStore};
use crate::lifecycle::{spawn_periodic, Shutdown};
use crate::redundancy::error::RedundancyError;
use crate::redundancy::snapshot::{HealthSnapshot, HealthStatus};
use crate::resilience::BackoffPolicy;
use crate::store::{EntityKind, StoreConnector, StoreRole};
use crate::sync::{SyncEngine, SyncReport, SyncStatus};

pub struct RedundancyManager<C: StoreConnector> {
    primary: Arc<MonitoredStore<C>>,
    secondary: Option<Arc<MonitoredStore<C>>>,
    monitor: HealthMonitor<C>,
    state: FailoverStateMachine,
    sync: Option<SyncEngine<C>>,
    failback_policy: BackoffPolicy,
    shutdown: Shutdown,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    drain_timeout: Duration,
    closed: AtomicBool,
}

impl<C: StoreConnector> RedundancyManager<C> {
    /// Build the manager, run one health pass and start the timers.
    ///
    /// Without a secondary the manager runs in single-store mode: only the
    /// primary is probed, the designation never moves and no sync runs.
    pub async fn start(
        primary: Arc<C>,
        secondary: Option<Arc<C>>,
        config: &RedundancyConfig,
        entities: Vec<EntityKind>,
    ) -> Arc<Self> {
        let primary = Arc::new(MonitoredStore::new(StoreRole::Primary, primary));
        let secondary = secondary.map(|c| Arc::new(MonitoredStore::new(StoreRole::Secondary, c)));

        let mut probed = vec![primary.clone()];
        probed.extend(secondary.iter().cloned());
        let monitor = HealthMonitor::new(probed, config.probe_timeout());

        let state = FailoverStateMachine::new(Thresholds {
            failover: config.failover_threshold,
            failback: config.failback_threshold,
        });
        let sync = secondary.as_ref().map(|s| {
            SyncEngine::new(
                primary.clone(),
                s.clone(),
                state.designation(),
                entities.clone(),
                config.statement_timeout(),
            )
        });

        let manager = Arc::new(Self {
            primary,
            secondary,
            monitor,
            state,
            sync,
            failback_policy: BackoffPolicy::failback_sync(config),
            shutdown: Shutdown::new(),
            tasks: Mutex::new(Vec::new()),
            drain_timeout: Duration::from_secs(config.drain_timeout_secs),
            closed: AtomicBool::new(false),
        });

        tracing::info!(
            redundancy_enabled = manager.redundancy_enabled(),
            primary = manager.primary.connector().name(),
            secondary = manager.secondary.as_ref().map(|s| s.connector().name()),
            entities = entities.len(),
            "Starting redundancy manager"
        );

        manager.tick_health().await;
        manager.spawn_timers(config);
        manager
    }

    /// Timers hold a weak reference so that dropping the manager stops them.
    fn spawn_timers(self: &Arc<Self>, config: &RedundancyConfig) {
        let mut handles = Vec::new();

        let weak = Arc::downgrade(self);
        handles.push(spawn_periodic(
            "health_check",
            config.health_check_interval(),
            self.shutdown.subscribe(),
            move || {
                let weak = weak.clone();
                async move {
                    if let Some(manager) = weak.upgrade() {
                        manager.tick_health().await;
                    }
                }
            },
        ));

        if self.sync.is_some() {
            let weak = Arc::downgrade(self);
            handles.push(spawn_periodic(
                "sync",
                config.sync_interval(),
                self.shutdown.subscribe(),
                move || {
                    let weak = weak.clone();
                    async move {
                        if let Some(manager) = weak.upgrade() {
                            manager.tick_sync().await;
                        }
                    }
                },
            ));
        }

        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.extend(handles);
        }
    }

    pub fn redundancy_enabled(&self) -> bool {
        self.secondary.is_some()
    }

    pub fn active_store(&self) -> StoreRole {
        self.state.active()
    }

    /// Connector of the currently designated store.
    ///
    /// Returned even when that store is failing its probes; callers handle
    /// their own query errors.
    pub fn active_connector(&self) -> Result<Arc<C>, RedundancyError> {
        let role = self.state.active();
        let ever_connected = self.primary.ever_connected()
            || self.secondary.as_ref().map(|s| s.ever_connected()).unwrap_or(false);
        if !ever_connected {
            return Err(RedundancyError::NoStoreAvailable);
        }
        match (role, &self.secondary) {
            (StoreRole::Secondary, Some(secondary)) => Ok(secondary.connector().clone()),
            _ => Ok(self.primary.connector().clone()),
        }
    }

    pub fn health(&self) -> HealthSnapshot {
        let primary = self.primary.health();
        let secondary = self.secondary.as_ref().map(|s| s.health());
        HealthSnapshot {
            status: HealthStatus::from_records(&primary, secondary.as_deref()),
            redundancy_enabled: self.redundancy_enabled(),
            active_store: self.state.active(),
            both_stores_degraded: self.state.both_degraded(),
            last_switch: self.state.last_switch(),
            transitions: self.state.transitions(),
            primary: (*primary).clone(),
            secondary: secondary.map(|s| (*s).clone()),
            sync_status: self
                .sync
                .as_ref()
                .map(|s| (*s.status()).clone())
                .unwrap_or_default(),
        }
    }

    pub fn sync_status(&self) -> Option<Arc<SyncStatus>> {
        self.sync.as_ref().map(|s| s.status())
    }

    /// Run a sync pass now, from the active store to the other.
    pub async fn force_sync(&self) -> Result<SyncReport, RedundancyError> {
        self.ensure_running()?;
        let sync = self.sync.as_ref().ok_or(RedundancyError::NoSecondary)?;
        let report = sync.sync_from(self.state.active()).await?;
        Ok(report)
    }

    /// Designate the secondary now, whatever the thresholds say.
    pub async fn force_failover(&self) -> Result<TransitionOutcome, RedundancyError> {
        self.ensure_running()?;
        let secondary = self.secondary.as_ref().ok_or(RedundancyError::NoSecondary)?;
        let guard = self.state.try_lock().ok_or(RedundancyError::Busy)?;
        if !secondary.is_connected() {
            tracing::warn!(store = %StoreRole::Secondary, "Forcing failover onto a store that is not connected");
        }
        Ok(self.state.failover(&guard, Trigger::Forced))
    }

    /// Designate the primary now, after the reverse sync.
    pub async fn force_failback(&self) -> Result<TransitionOutcome, RedundancyError> {
        self.ensure_running()?;
        let sync = self.sync.as_ref().ok_or(RedundancyError::NoSecondary)?;
        let guard = self.state.try_lock().ok_or(RedundancyError::Busy)?;
        if !self.primary.is_connected() {
            tracing::warn!(store = %StoreRole::Primary, "Forcing failback onto a store that is not connected");
        }
        Ok(self
            .state
            .failback(&guard, sync, self.failback_policy, Trigger::Forced)
            .await)
    }

    /// One health pass followed by the transition rule.
    ///
    /// An automatic failback runs on its own task holding the transition
    /// lock, so later ticks keep probing while its reverse sync runs.
    pub async fn tick_health(self: &Arc<Self>) {
        let records = self.monitor.probe_all().await;
        let (Some(_), [primary, secondary]) = (&self.sync, records.as_slice()) else {
            return;
        };

        match self.state.evaluate(primary, secondary) {
            Decision::Stay | Decision::BothDegraded => {}
            Decision::Failover => match self.state.try_lock() {
                Some(guard) => {
                    self.state.failover(&guard, Trigger::Automatic);
                }
                None => tracing::debug!("Failover deferred: transition in progress"),
            },
            Decision::Failback => match self.state.try_lock() {
                Some(guard) => {
                    let manager = Arc::clone(self);
                    tokio::spawn(async move {
                        if let Some(sync) = &manager.sync {
                            manager
                                .state
                                .failback(&guard, sync, manager.failback_policy, Trigger::Automatic)
                                .await;
                        }
                    });
                }
                None => tracing::debug!("Failback deferred: transition in progress"),
            },
        }
    }

    /// Wait until no failover or failback is running.
    pub async fn wait_for_transition(&self) {
        drop(self.state.lock().await);
    }

    /// One scheduled sync pass, skipped when a store is down or a pass is running.
    pub async fn tick_sync(&self) {
        let Some(sync) = &self.sync else {
            return;
        };
        if let Err(e) = sync.sync_from(self.state.active()).await {
            tracing::debug!(error = %e, "Scheduled sync skipped");
        }
    }

    /// Stop the timers, wait for in-flight work and close both connectors.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("Stopping redundancy manager");

        self.shutdown.trigger();
        if let Some(sync) = &self.sync {
            sync.request_stop();
        }

        let handles = match self.tasks.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(_) => Vec::new(),
        };
        let drain = async {
            join_all(handles).await;
            self.wait_for_transition().await;
        };
        if tokio::time::timeout(self.drain_timeout, drain).await.is_err() {
            tracing::warn!(
                drain_timeout_secs = self.drain_timeout.as_secs(),
                "Background work still running at drain deadline"
            );
        }

        self.primary.connector().close().await;
        if let Some(secondary) = &self.secondary {
            secondary.connector().close().await;
        }
        tracing::info!("Redundancy manager stopped");
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_running(&self) -> Result<(), RedundancyError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(RedundancyError::ShuttingDown)
        } else {
            Ok(())
        }
    }
}

impl<C: StoreConnector> Drop for RedundancyManager<C> {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::SeqCst) {
            self.shutdown.trigger();
            if let Some(sync) = &self.sync {
                sync.request_stop();
            }
        }
    }
}
