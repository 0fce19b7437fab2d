//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request id, trace, timeout, body limit)
//!     → admin router (health snapshot, operator actions)
//!     → JSON response
//! ```

pub mod server;

pub use server::{HttpServer, X_REQUEST_ID};
