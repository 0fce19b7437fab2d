//! Relational store access.
//!
//! # Data Flow
//! ```text
//! config (connection strings)
//!     → postgres.rs (sqlx pool per store, lazily connected)
//!     → connector.rs (StoreConnector: ping / fetch_all / upsert)
//!     → health monitor probes, sync engine copies rows,
//!       application code queries whichever store is active
//!
//! entities.rs:
//!     one typed record per replicated table
//!     → select/upsert statements derived from the column list
//! ```
//!
//! # Design Decisions
//! - Two connector instances exist: primary and (optionally) secondary
//! - Connectors never retry; callers own timeouts and policy
//! - memory.rs is an in-process store with fault injection for tests and dry runs

pub mod connector;
pub mod entities;
pub mod memory;
pub mod postgres;

use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub use connector::StoreConnector;
pub use entities::{EntityKind, Record};
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Which of the two configured stores.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreRole {
    Primary = 0,
    Secondary = 1,
}

impl StoreRole {
    /// The other store of the pair.
    pub fn other(self) -> Self {
        match self {
            StoreRole::Primary => StoreRole::Secondary,
            StoreRole::Secondary => StoreRole::Primary,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StoreRole::Primary => "primary",
            StoreRole::Secondary => "secondary",
        }
    }
}

impl From<u8> for StoreRole {
    fn from(val: u8) -> Self {
        match val {
            1 => StoreRole::Secondary,
            _ => StoreRole::Primary,
        }
    }
}

impl fmt::Display for StoreRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported by a store connector.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection could not be established or was lost.
    #[error("connection error: {0}")]
    Connection(String),

    /// The store rejected or failed a statement.
    #[error("query error: {0}")]
    Query(String),

    /// The connector has been closed.
    #[error("store closed")]
    Closed,
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => StoreError::Connection("pool acquire timed out".to_string()),
            sqlx::Error::PoolClosed => StoreError::Closed,
            sqlx::Error::Io(e) => StoreError::Connection(e.to_string()),
            sqlx::Error::Tls(e) => StoreError::Connection(e.to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip_through_u8() {
        assert_eq!(StoreRole::from(StoreRole::Primary as u8), StoreRole::Primary);
        assert_eq!(StoreRole::from(StoreRole::Secondary as u8), StoreRole::Secondary);
        assert_eq!(StoreRole::Primary.other(), StoreRole::Secondary);
        assert_eq!(StoreRole::Secondary.to_string(), "secondary");
    }
}
