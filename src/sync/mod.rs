//! Data synchronization between the primary and secondary stores.
//!
//! # Data Flow
//! ```text
//! sync timer / operator / failback
//!     → engine.rs takes the pass lock (one pass at a time)
//!     → for each replicated entity in order:
//!           read all rows from the source
//!           upsert each row into the target by key
//!     → status.rs published for the health API
//! ```
//!
//! # Design Decisions
//! - Periodic passes copy from the active store to the other one
//! - Upserts are idempotent, so re-running a pass is always safe
//! - A failed row is logged and counted; the pass moves on
//! - Deletions are not propagated
//! - A pass whose source stops being the active store stops at the next row

pub mod engine;
pub mod status;

pub use engine::{PassGuard, SyncEngine};
pub use status::{SyncDirection, SyncError, SyncReport, SyncState, SyncStatus};
