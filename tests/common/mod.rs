//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use db_redundancy::config::RedundancyConfig;
use db_redundancy::store::entities::{AppConfig, Lead};
use db_redundancy::store::{EntityKind, MemoryStore, Record};
use db_redundancy::RedundancyManager;

pub type Manager = Arc<RedundancyManager<MemoryStore>>;

/// Policy with timers far enough out that tests drive every tick by hand.
pub fn manual_config() -> RedundancyConfig {
    RedundancyConfig {
        health_check_interval_ms: 3_600_000,
        sync_interval_ms: 3_600_000,
        probe_timeout_ms: 500,
        statement_timeout_ms: 1_000,
        failback_sync_backoff_ms: 10,
        failback_sync_backoff_max_ms: 50,
        drain_timeout_secs: 5,
        ..RedundancyConfig::default()
    }
}

pub struct Pair {
    pub manager: Manager,
    pub primary: Arc<MemoryStore>,
    pub secondary: Arc<MemoryStore>,
}

/// Start a manager over two in-memory stores.
pub async fn start_pair(config: RedundancyConfig) -> Pair {
    let primary = Arc::new(MemoryStore::new("primary"));
    let secondary = Arc::new(MemoryStore::new("secondary"));
    let manager = RedundancyManager::start(
        primary.clone(),
        Some(secondary.clone()),
        &config,
        EntityKind::ALL.to_vec(),
    )
    .await;
    Pair { manager, primary, secondary }
}

/// Start a manager with no secondary.
pub async fn start_single(config: RedundancyConfig) -> (Manager, Arc<MemoryStore>) {
    let primary = Arc::new(MemoryStore::new("primary"));
    let manager =
        RedundancyManager::start(primary.clone(), None, &config, EntityKind::ALL.to_vec()).await;
    (manager, primary)
}

pub async fn health_ticks(manager: &Manager, n: usize) {
    for _ in 0..n {
        manager.tick_health().await;
    }
}

pub fn setting(id: i32, value: &str) -> Record {
    AppConfig {
        id,
        key: format!("setting-{id}"),
        value: value.to_string(),
        created_at: None,
        updated_at: None,
    }
    .into()
}

pub fn lead(id: i32, email: &str) -> Record {
    Lead {
        id,
        full_name: format!("Lead {id}"),
        email: email.to_string(),
        phone: None,
        company: None,
        investment_size: "50k-100k".to_string(),
        message: None,
        consent_given: Some(true),
        created_at: None,
        updated_at: None,
        status: Some("new".to_string()),
        assigned_to: None,
        notes: None,
        source: None,
        follow_up_date: None,
        last_contact: None,
        language_preference: None,
        original_referrer: None,
        additional_data: None,
    }
    .into()
}
