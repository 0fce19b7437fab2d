//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, value: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, value } => {
                write!(f, "Invalid value for {}: {:?}", var, value)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration: TOML file (if any), then environment, then validate.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables on top of the file configuration.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = non_empty(lookup("DATABASE_URL")) {
        config.stores.primary_url = Some(url);
    }
    if let Some(url) = non_empty(lookup("DATABASE_URL_SECONDARY")) {
        config.stores.secondary_url = Some(url);
    }
    if let Some(key) = non_empty(lookup("DB_ADMIN_API_KEY")) {
        config.admin.api_key = Some(key);
    }

    let r = &mut config.redundancy;
    parse_into(&lookup, "DB_SYNC_INTERVAL_MS", &mut r.sync_interval_ms)?;
    parse_into(&lookup, "DB_HEALTH_CHECK_INTERVAL_MS", &mut r.health_check_interval_ms)?;
    parse_into(&lookup, "DB_FAILOVER_THRESHOLD", &mut r.failover_threshold)?;
    parse_into(&lookup, "DB_FAILBACK_THRESHOLD", &mut r.failback_threshold)?;
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_into<F, T>(lookup: &F, var: &'static str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = non_empty(lookup(var)) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Env { var, value: raw.clone() })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = ServiceConfig::default();
        config.stores.primary_url = Some("postgres://file@db/app".into());

        apply_env_overrides(
            &mut config,
            env(&[
                ("DATABASE_URL", "postgres://env@db/app"),
                ("DATABASE_URL_SECONDARY", "postgres://env@db2/app"),
                ("DB_FAILOVER_THRESHOLD", "4"),
                ("DB_HEALTH_CHECK_INTERVAL_MS", " 1000 "),
            ]),
        )
        .unwrap();

        assert_eq!(config.stores.primary_url.as_deref(), Some("postgres://env@db/app"));
        assert_eq!(config.stores.secondary_url.as_deref(), Some("postgres://env@db2/app"));
        assert_eq!(config.redundancy.failover_threshold, 4);
        assert_eq!(config.redundancy.health_check_interval_ms, 1000);
        assert_eq!(config.redundancy.failback_threshold, 5);
    }

    #[test]
    fn test_empty_secondary_keeps_single_store_mode() {
        let mut config = ServiceConfig::default();
        apply_env_overrides(&mut config, env(&[("DATABASE_URL_SECONDARY", "")])).unwrap();
        assert!(config.stores.secondary_url.is_none());
    }

    #[test]
    fn test_malformed_number_is_an_error() {
        let mut config = ServiceConfig::default();
        let err = apply_env_overrides(&mut config, env(&[("DB_SYNC_INTERVAL_MS", "hourly")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "DB_SYNC_INTERVAL_MS", .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Some(Path::new("/nonexistent/redundancy.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
