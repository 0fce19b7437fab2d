//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Logging/metrics → Connectors → Manager → Listener
//!
//! Timers (scheduler.rs):
//!     health check tick, sync tick → redundancy manager
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop timers → Drain in-flight work → Close pools → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Shutdown has a deadline; pools are closed even if work is still draining

pub mod scheduler;
pub mod shutdown;
pub mod signals;

pub use scheduler::spawn_periodic;
pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
