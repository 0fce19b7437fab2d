//! Failover subsystem.
//!
//! # Data Flow
//! ```text
//! health tick
//!     → health records (primary, secondary)
//!     → state.rs decide(): stay / failover / failback / both-degraded
//!     → transition under the transition lock
//!     → active designation read by every caller of the redundancy manager
//! ```
//!
//! # Design Decisions
//! - The designation is one atomic; readers never wait and never see a torn value
//! - Automatic and forced transitions share one lock; a busy lock means skip or 409
//! - Failback threshold above failover threshold avoids flapping
//! - Fail static: no move onto a store that is itself failing
//! - Failback holds the sync pass lock through its reverse sync and the switch

pub mod state;

pub use state::{
    decide, Decision, Designation, FailoverStateMachine, Thresholds, TransitionGuard, TransitionOutcome,
    Trigger,
};
