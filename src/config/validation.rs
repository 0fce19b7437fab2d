//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Require a primary store; never fall back to built-in credentials
//! - Validate value ranges (thresholds and intervals > 0)
//! - Reject unknown replicated entities
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Runs before any connector is built; failure aborts startup

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ServiceConfig;
use crate::store::EntityKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("primary store connection string is required (stores.primary_url or DATABASE_URL)")]
    MissingPrimaryUrl,

    #[error("{store} connection string is not a valid URL: {reason}")]
    InvalidUrl { store: &'static str, reason: String },

    #[error("{store} connection string uses unsupported scheme '{scheme}'")]
    UnsupportedScheme { store: &'static str, scheme: String },

    #[error("secondary store must differ from the primary store")]
    SameStore,

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("unknown replicated entity '{0}'")]
    UnknownEntity(String),

    #[error("invalid bind address '{0}'")]
    InvalidBindAddress(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigWarning {
    #[error("failback threshold ({failback}) is not above failover threshold ({failover}); designation may flap")]
    FlappingThresholds { failover: u32, failback: u32 },
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match &config.stores.primary_url {
        Some(url) => check_url("primary", url, &mut errors),
        None => errors.push(ValidationError::MissingPrimaryUrl),
    }
    if let Some(url) = &config.stores.secondary_url {
        check_url("secondary", url, &mut errors);
        if config.stores.primary_url.as_deref() == Some(url.as_str()) {
            errors.push(ValidationError::SameStore);
        }
    }

    let r = &config.redundancy;
    let positive = [
        ("redundancy.failover_threshold", r.failover_threshold as u64),
        ("redundancy.failback_threshold", r.failback_threshold as u64),
        ("redundancy.health_check_interval_ms", r.health_check_interval_ms),
        ("redundancy.sync_interval_ms", r.sync_interval_ms),
        ("redundancy.probe_timeout_ms", r.probe_timeout_ms),
        ("redundancy.statement_timeout_ms", r.statement_timeout_ms),
        ("redundancy.failback_sync_attempts", r.failback_sync_attempts as u64),
        ("stores.max_connections", config.stores.max_connections as u64),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }

    for name in &config.replication.entities {
        if EntityKind::from_table(name).is_none() {
            errors.push(ValidationError::UnknownEntity(name.clone()));
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(config.listener.bind_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Settings that are valid but probably not intended.
///
/// Returned rather than logged so the caller can report them once logging is up.
pub fn config_warnings(config: &ServiceConfig) -> Vec<ConfigWarning> {
    let r = &config.redundancy;
    let mut warnings = Vec::new();
    if r.failback_threshold <= r.failover_threshold {
        warnings.push(ConfigWarning::FlappingThresholds {
            failover: r.failover_threshold,
            failback: r.failback_threshold,
        });
    }
    warnings
}

fn check_url(store: &'static str, raw: &str, errors: &mut Vec<ValidationError>) {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "postgres" | "postgresql") => {}
        Ok(url) => errors.push(ValidationError::UnsupportedScheme {
            store,
            scheme: url.scheme().to_string(),
        }),
        Err(e) => errors.push(ValidationError::InvalidUrl {
            store,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ServiceConfig {
        let mut config = ServiceConfig::default();
        config.stores.primary_url = Some("postgres://app:pw@db1:5432/app".into());
        config
    }

    #[test]
    fn test_single_store_config_is_valid() {
        assert_eq!(validate_config(&valid()), Ok(()));
    }

    #[test]
    fn test_missing_primary_is_rejected() {
        let errors = validate_config(&ServiceConfig::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingPrimaryUrl]);
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = valid();
        config.stores.secondary_url = Some("mysql://db2/app".into());
        config.redundancy.failover_threshold = 0;
        config.redundancy.health_check_interval_ms = 0;
        config.replication.entities = vec!["users".into(), "sessions".into()];
        config.listener.bind_address = "nowhere".into();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::UnsupportedScheme {
            store: "secondary",
            scheme: "mysql".into()
        }));
        assert!(errors.contains(&ValidationError::Zero("redundancy.failover_threshold")));
        assert!(errors.contains(&ValidationError::Zero("redundancy.health_check_interval_ms")));
        assert!(errors.contains(&ValidationError::UnknownEntity("sessions".into())));
        assert!(errors.contains(&ValidationError::InvalidBindAddress("nowhere".into())));
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn test_same_store_twice_is_rejected() {
        let mut config = valid();
        config.stores.secondary_url = config.stores.primary_url.clone();
        assert_eq!(validate_config(&config), Err(vec![ValidationError::SameStore]));
    }

    #[test]
    fn test_low_failback_threshold_is_a_warning() {
        let mut config = valid();
        assert!(config_warnings(&config).is_empty());

        config.redundancy.failover_threshold = 4;
        config.redundancy.failback_threshold = 4;
        assert_eq!(validate_config(&config), Ok(()));
        assert_eq!(
            config_warnings(&config),
            vec![ConfigWarning::FlappingThresholds { failover: 4, failback: 4 }]
        );
    }

    #[test]
    fn test_garbage_url_is_rejected() {
        let mut config = valid();
        config.stores.primary_url = Some("not a url".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidUrl { store: "primary", .. }));
    }
}
