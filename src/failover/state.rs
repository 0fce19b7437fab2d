//! Active store designation and the transitions between stores.
//!
//! # States
//! - Primary-Active (initial)
//! - Secondary-Active
//!
//! # Transitions
//! ```text
//! Primary-Active   → Secondary-Active: primary failures >= failover threshold
//!                                      AND secondary connected
//! Secondary-Active → Primary-Active:   primary successes >= failback threshold
//!                                      (reverse sync attempted first)
//! ```
//! A failing active store with no healthy alternative is reported as
//! both-degraded; the designation does not move.

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::health::HealthRecord;
use crate::observability::metrics;
use crate::resilience::BackoffPolicy;
use crate::store::{StoreConnector, StoreRole};
use crate::sync::{PassGuard, SyncEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub failover: u32,
    pub failback: u32,
}

/// What the latest health records call for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Stay,
    Failover,
    Failback,
    BothDegraded,
}

/// Who asked for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Automatic,
    Forced,
}

impl Trigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::Automatic => "automatic",
            Trigger::Forced => "forced",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Switched,
    /// Already in the target state; nothing changed.
    AlreadyActive,
}

/// Pure transition rule.
pub fn decide(
    active: StoreRole,
    primary: &HealthRecord,
    secondary: &HealthRecord,
    thresholds: Thresholds,
) -> Decision {
    match active {
        StoreRole::Primary => {
            if primary.consecutive_failures < thresholds.failover {
                Decision::Stay
            } else if secondary.connected {
                Decision::Failover
            } else {
                Decision::BothDegraded
            }
        }
        StoreRole::Secondary => {
            if primary.consecutive_successes >= thresholds.failback {
                Decision::Failback
            } else if secondary.consecutive_failures >= thresholds.failover && !primary.connected {
                Decision::BothDegraded
            } else {
                Decision::Stay
            }
        }
    }
}

/// The active-store cell, shared with the sync engine.
///
/// Written only by the state machine; readers get a single atomic load.
#[derive(Debug)]
pub struct Designation(AtomicU8);

impl Designation {
    pub fn new(role: StoreRole) -> Self {
        Self(AtomicU8::new(role as u8))
    }

    pub fn load(&self) -> StoreRole {
        StoreRole::from(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn swap(&self, role: StoreRole) -> StoreRole {
        StoreRole::from(self.0.swap(role as u8, Ordering::AcqRel))
    }
}

/// Proof that the caller holds the transition lock.
///
/// Owned, so a transition can run on its own task.
pub struct TransitionGuard {
    _lock: OwnedMutexGuard<()>,
}

pub struct FailoverStateMachine {
    active: Arc<Designation>,
    thresholds: Thresholds,
    transition_lock: Arc<Mutex<()>>,
    both_degraded: AtomicBool,
    last_switch: ArcSwapOption<DateTime<Utc>>,
    transitions: AtomicU64,
}

impl FailoverStateMachine {
    pub fn new(thresholds: Thresholds) -> Self {
        metrics::record_active_store(StoreRole::Primary);
        Self {
            active: Arc::new(Designation::new(StoreRole::Primary)),
            thresholds,
            transition_lock: Arc::new(Mutex::new(())),
            both_degraded: AtomicBool::new(false),
            last_switch: ArcSwapOption::empty(),
            transitions: AtomicU64::new(0),
        }
    }

    /// Current designation. A single atomic load; never torn.
    pub fn active(&self) -> StoreRole {
        self.active.load()
    }

    pub fn designation(&self) -> Arc<Designation> {
        self.active.clone()
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn both_degraded(&self) -> bool {
        self.both_degraded.load(Ordering::Acquire)
    }

    pub fn last_switch(&self) -> Option<DateTime<Utc>> {
        self.last_switch.load_full().map(|at| *at)
    }

    pub fn transitions(&self) -> u64 {
        self.transitions.load(Ordering::Acquire)
    }

    /// Take the transition lock without waiting.
    pub fn try_lock(&self) -> Option<TransitionGuard> {
        self.transition_lock
            .clone()
            .try_lock_owned()
            .ok()
            .map(|lock| TransitionGuard { _lock: lock })
    }

    /// Wait for any running transition, then take the lock.
    pub async fn lock(&self) -> TransitionGuard {
        TransitionGuard {
            _lock: self.transition_lock.clone().lock_owned().await,
        }
    }

    /// Decide from the latest records and publish the both-degraded flag.
    pub fn evaluate(&self, primary: &HealthRecord, secondary: &HealthRecord) -> Decision {
        let decision = decide(self.active(), primary, secondary, self.thresholds);
        let degraded = decision == Decision::BothDegraded;
        let was_degraded = self.both_degraded.swap(degraded, Ordering::AcqRel);

        if degraded && !was_degraded {
            tracing::error!(
                active = %self.active(),
                primary_failures = primary.consecutive_failures,
                secondary_connected = secondary.connected,
                "Both stores degraded; keeping current designation"
            );
        } else if !degraded && was_degraded {
            tracing::info!(active = %self.active(), "Store health recovered");
        }
        if degraded != was_degraded {
            metrics::record_both_degraded(degraded);
        }
        decision
    }

    /// Designate the secondary.
    pub fn failover(&self, _held: &TransitionGuard, trigger: Trigger) -> TransitionOutcome {
        self.switch_to(StoreRole::Secondary, trigger)
    }

    /// Designate the primary, after trying to copy the secondary's rows back.
    ///
    /// Waits for a running sync pass to finish, then holds the pass lock
    /// through the reverse sync and the switch, so no pass that started
    /// against the old designation can write after it. The reverse sync is
    /// retried per `policy`; if it never succeeds the failback still happens
    /// and the failure is recorded on the sync status.
    pub async fn failback<C: StoreConnector>(
        &self,
        _held: &TransitionGuard,
        sync: &SyncEngine<C>,
        policy: BackoffPolicy,
        trigger: Trigger,
    ) -> TransitionOutcome {
        if self.active() == StoreRole::Primary {
            return TransitionOutcome::AlreadyActive;
        }
        let pass = sync.begin_pass().await;
        reverse_sync(sync, &pass, policy).await;
        self.switch_to(StoreRole::Primary, trigger)
    }

    fn switch_to(&self, target: StoreRole, trigger: Trigger) -> TransitionOutcome {
        let from = self.active.swap(target);
        if from == target {
            return TransitionOutcome::AlreadyActive;
        }

        self.last_switch.store(Some(Arc::new(Utc::now())));
        self.transitions.fetch_add(1, Ordering::AcqRel);

        let kind = match target {
            StoreRole::Secondary => "failover",
            StoreRole::Primary => "failback",
        };
        metrics::record_transition(kind, trigger.as_str());
        metrics::record_active_store(target);

        match target {
            StoreRole::Secondary => tracing::warn!(
                from = %from,
                to = %target,
                trigger = trigger.as_str(),
                "Failed over to secondary store"
            ),
            StoreRole::Primary => tracing::info!(
                from = %from,
                to = %target,
                trigger = trigger.as_str(),
                "Failed back to primary store"
            ),
        }
        TransitionOutcome::Switched
    }
}

async fn reverse_sync<C: StoreConnector>(
    sync: &SyncEngine<C>,
    pass: &PassGuard<'_>,
    policy: BackoffPolicy,
) {
    let attempts = policy.attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        if attempt > 1 {
            tokio::time::sleep(policy.delay(attempt - 1)).await;
        }
        if sync.is_stopping() {
            last_error = "shutdown in progress".to_string();
            break;
        }

        match sync.run_pass(pass, StoreRole::Secondary).await {
            Ok(report) if report.is_clean() => {
                tracing::info!(
                    attempt,
                    rows_synced = report.rows_synced,
                    "Reverse sync before failback completed"
                );
                sync.clear_failback_failure();
                return;
            }
            Ok(report) => {
                last_error = report
                    .first_error
                    .unwrap_or_else(|| format!("{} rows failed", report.rows_failed));
            }
            Err(e) => {
                last_error = e.to_string();
                break;
            }
        }
        tracing::warn!(attempt, attempts, error = %last_error, "Reverse sync before failback failed");
    }

    tracing::error!(
        attempts,
        error = %last_error,
        "Reverse sync before failback abandoned; rows written to the secondary may be missing on the primary"
    );
    metrics::record_failback_sync_failure();
    sync.record_failback_failure(format!("reverse sync before failback failed: {last_error}"));
}
