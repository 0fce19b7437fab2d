//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (DATABASE_URL, DATABASE_URL_SECONDARY, DB_*)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → handed to the redundancy manager and admin server at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults except the connection strings
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::ServiceConfig;
pub use schema::ListenerConfig;
pub use schema::StoreConfig;
pub use schema::RedundancyConfig;
pub use schema::ReplicationConfig;
pub use schema::ObservabilityConfig;
pub use schema::AdminConfig;
pub use loader::{load_config, ConfigError};
pub use validation::{config_warnings, validate_config, ConfigWarning, ValidationError};

use url::Url;

/// Render a connection string with its password masked.
pub fn redact_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => "<unparseable>".to_string(),
    }
}
