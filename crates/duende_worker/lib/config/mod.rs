use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_MEILISEARCH_HOST: &str = "http://localhost:7700";
pub const DEFAULT_MEILISEARCH_INDEX: &str = "events";
const DEFAULT_TASK_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_TASK_POLL_MS: u64 = 250;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is required (env var or --{flag})")]
    Missing {
        name: &'static str,
        flag: &'static str,
    },
    #[error("{name} must be a positive integer of milliseconds, got `{value}`")]
    InvalidMillis { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    pub host: String,
    pub api_key: Option<String>,
    pub index_uid: String,
    pub task_timeout: Duration,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Main catalog database: events and artists.
    pub database_url: String,
    /// Interactions and event metrics. Falls back to `database_url`.
    pub analytics_database_url: String,
    pub search: SearchConfig,
}

impl Config {
    /// Builds the config from any variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing {
            name: "DATABASE_URL",
            flag: "database-url",
        })?;
        let analytics_database_url =
            var("ANALYTICS_DATABASE_URL").unwrap_or_else(|| database_url.clone());

        let millis = |name: &'static str, default: u64| -> Result<Duration, ConfigError> {
            match var(name) {
                None => Ok(Duration::from_millis(default)),
                Some(raw) => parse_millis(name, &raw),
            }
        };

        Ok(Self {
            database_url,
            analytics_database_url,
            search: SearchConfig {
                host: var("MEILISEARCH_HOST")
                    .unwrap_or_else(|| DEFAULT_MEILISEARCH_HOST.to_string()),
                api_key: var("MEILISEARCH_API_KEY"),
                index_uid: var("MEILISEARCH_INDEX")
                    .unwrap_or_else(|| DEFAULT_MEILISEARCH_INDEX.to_string()),
                task_timeout: millis("SEARCH_TASK_TIMEOUT_MS", DEFAULT_TASK_TIMEOUT_MS)?,
                poll_interval: millis("SEARCH_TASK_POLL_MS", DEFAULT_TASK_POLL_MS)?,
            },
        })
    }
}

pub fn parse_millis(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(Duration::from_millis(value)),
        _ => Err(ConfigError::InvalidMillis {
            name,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, ConfigError};
    use std::collections::HashMap;
    use std::time::Duration;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = config_from(&[("DATABASE_URL", "postgres://main")]).unwrap();
        assert_eq!(config.analytics_database_url, "postgres://main");
        assert_eq!(config.search.host, "http://localhost:7700");
        assert_eq!(config.search.index_uid, "events");
        assert_eq!(config.search.api_key, None);
        assert_eq!(config.search.task_timeout, Duration::from_secs(30));
        assert_eq!(config.search.poll_interval, Duration::from_millis(250));
    }

    #[test]
    fn missing_or_blank_database_url_is_rejected() {
        assert!(matches!(config_from(&[]), Err(ConfigError::Missing { .. })));
        assert!(matches!(
            config_from(&[("DATABASE_URL", "  ")]),
            Err(ConfigError::Missing { .. })
        ));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://main"),
            ("ANALYTICS_DATABASE_URL", "postgres://analytics"),
            ("MEILISEARCH_API_KEY", "secret"),
            ("SEARCH_TASK_TIMEOUT_MS", "1500"),
        ])
        .unwrap();
        assert_eq!(config.analytics_database_url, "postgres://analytics");
        assert_eq!(config.search.api_key.as_deref(), Some("secret"));
        assert_eq!(config.search.task_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn non_positive_millis_are_rejected() {
        assert_eq!(
            config_from(&[("DATABASE_URL", "x"), ("SEARCH_TASK_POLL_MS", "0")]),
            Err(ConfigError::InvalidMillis {
                name: "SEARCH_TASK_POLL_MS",
                value: "0".to_string(),
            })
        );
    }
}
