//! Resilience helpers.
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every store call has a deadline
//! - Retries are bounded and jittered; the only retried operation is the
//!   reverse sync before a failback

pub mod backoff;

pub use backoff::BackoffPolicy;
