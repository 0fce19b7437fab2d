//! Redundancy manager: the single entry point to the two stores.
//!
//! # Data Flow
//! ```text
//! main builds connectors
//!     → RedundancyManager::start (initial health pass, timers)
//!     → application code: active_connector() → queries
//!     → admin API: health(), force_sync(), force_failover(), force_failback()
//!     → shutdown() on exit
//! ```
//!
//! # Design Decisions
//! - Constructed explicitly and shared as `Arc`; no global instance
//! - The manager owns every timer it starts and stops them on shutdown or drop
//! - Infrastructure failures become state; only operator misuse is an error

pub mod error;
pub mod manager;
pub mod snapshot;

pub use error::RedundancyError;
pub use manager::RedundancyManager;
pub use snapshot::{HealthSnapshot, HealthStatus};
