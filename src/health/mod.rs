//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (lifecycle/scheduler.rs)
//!     → monitor.rs probes every configured store concurrently
//!     → record.rs health record published per store
//!     → failover state machine reads the records on the same tick
//!     → health API reads them at any time without blocking
//! ```
//!
//! # Design Decisions
//! - Probes always have a deadline; a timeout counts as a failure
//! - Records hold consecutive successes/failures, never both
//! - Health state is per-store; the designation lives in `failover`

pub mod monitor;
pub mod record;

pub use monitor::HealthMonitor;
pub use record::{HealthRecord, MonitoredStore};
