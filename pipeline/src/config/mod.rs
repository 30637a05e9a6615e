//! Runtime configuration.
//!
//! Read from the environment (and a `.env` file when present):
//!
//! | Variable | Default |
//! |---|---|
//! | `DASHBOARD_DATA_DIR` | `.rd-dashboard` |
//! | `DASHBOARD_FETCH_TIMEOUT_SECS` | `30` |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Store directory variable
pub const DATA_DIR_VAR: &str = "DASHBOARD_DATA_DIR";

/// Source read timeout variable, in seconds
pub const FETCH_TIMEOUT_VAR: &str = "DASHBOARD_FETCH_TIMEOUT_SECS";

const DEFAULT_DATA_DIR: &str = ".rd-dashboard";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding the stored collections
    pub data_dir: PathBuf,
    /// Upper bound for reading one import source
    pub fetch_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try loading .env file
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(DATA_DIR_VAR).filter(|v| !v.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir.trim());
        }

        if let Some(raw) = lookup(FETCH_TIMEOUT_VAR) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: FETCH_TIMEOUT_VAR.to_string(),
                    value: raw.clone(),
                    message: "expected a positive number of seconds".to_string(),
                })?;
            config.fetch_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_fetch_timeout(mut self, secs: u64) -> Self {
        self.fetch_timeout = Duration::from_secs(secs);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            (DATA_DIR_VAR, "/var/lib/rd"),
            (FETCH_TIMEOUT_VAR, " 5 "),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/rd"));
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_timeout() {
        for bad in ["0", "soon", "-1"] {
            let err = Config::from_lookup(lookup(&[(FETCH_TIMEOUT_VAR, bad)])).unwrap_err();
            assert!(err.to_string().contains(FETCH_TIMEOUT_VAR));
        }
    }

    #[test]
    fn test_builder_overrides() {
        let config = Config::default().with_data_dir("/tmp/x").with_fetch_timeout(2);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/x"));
        assert_eq!(config.fetch_timeout, Duration::from_secs(2));
    }
}
