//! Database redundancy and failover manager.
//!
//! Keeps a primary and an optional secondary PostgreSQL store available:
//! probes both, designates which one serves traffic, copies rows between
//! them and exposes operator controls over HTTP.

// Stores
pub mod config;
pub mod store;

// Redundancy core
pub mod failover;
pub mod health;
pub mod redundancy;
pub mod sync;

// Operator surface
pub mod admin;
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use redundancy::{HealthSnapshot, RedundancyError, RedundancyManager};
pub use store::{MemoryStore, PgStore, StoreConnector};
