//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! health monitor, failover state machine, sync engine
//!     → logging.rs (structured events via tracing)
//!     → metrics.rs (gauges, counters, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Every state change is logged with the store name and the trigger
//! - Sync passes run inside a span carrying the pass id
//! - Metrics are cheap; the exporter is opt-in

pub mod logging;
pub mod metrics;
