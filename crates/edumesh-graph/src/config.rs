//! Configuration for the graph store
//!
//! Values come from environment variables (optionally loaded from a `.env`
//! file) with local-development defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::data::errors::StoreError;

/// Which backend the store should try to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// Probe the durable backend, fall back to the in-memory graph on failure.
    #[default]
    Auto,
    /// Skip the probe and use the in-memory graph.
    Mock,
}

impl FromStr for BackendPreference {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" | "neo4j" | "durable" => Ok(BackendPreference::Auto),
            "mock" | "memory" => Ok(BackendPreference::Mock),
            other => Err(StoreError::Configuration(format!("Unknown graph backend: {}", other))),
        }
    }
}

/// Graph store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Bolt endpoint of the durable graph database
    #[serde(default = "default_uri")]
    pub uri: String,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_password")]
    pub password: String,

    /// Database name, server default when unset
    #[serde(default)]
    pub database: Option<String>,

    /// Maximum pooled connections
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Upper bound for the one-shot connectivity probe
    #[serde(default = "default_connect_timeout", with = "duration_secs")]
    pub connect_timeout: Duration,

    #[serde(default)]
    pub backend: BackendPreference,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_username() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "password".to_string()
}

fn default_pool_size() -> usize {
    10
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            username: default_username(),
            password: default_password(),
            database: None,
            pool_size: default_pool_size(),
            connect_timeout: default_connect_timeout(),
            backend: BackendPreference::default(),
        }
    }
}

impl StoreConfig {
    /// Configuration that always uses the in-memory graph.
    pub fn mock() -> Self {
        Self {
            backend: BackendPreference::Mock,
            ..Self::default()
        }
    }

    /// Load configuration from `.env` and environment variables
    pub fn from_env() -> Result<Self, StoreError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(uri) = lookup("NEO4J_URI") {
            config.uri = uri;
        }

        if let Some(user) = lookup("NEO4J_USER").or_else(|| lookup("NEO4J_USERNAME")) {
            config.username = user;
        }

        if let Some(password) = lookup("NEO4J_PASSWORD") {
            config.password = password;
        }

        if let Some(database) = lookup("NEO4J_DATABASE") {
            if !database.is_empty() {
                config.database = Some(database);
            }
        }

        if let Some(pool_size) = lookup("NEO4J_POOL_SIZE") {
            match pool_size.parse::<usize>() {
                Ok(size) if size > 0 => config.pool_size = size,
                _ => warn!("Invalid NEO4J_POOL_SIZE value: {}", pool_size),
            }
        }

        if let Some(timeout) = lookup("NEO4J_CONNECT_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) => config.connect_timeout = Duration::from_secs(secs),
                Err(_) => warn!("Invalid NEO4J_CONNECT_TIMEOUT_SECS value: {}", timeout),
            }
        }

        if let Some(backend) = lookup("EDUMESH_GRAPH_BACKEND") {
            config.backend = backend.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks that endpoint and credentials are present.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.uri.trim().is_empty() {
            return Err(StoreError::Configuration("Graph database URI is required".to_string()));
        }
        if self.username.trim().is_empty() {
            return Err(StoreError::Configuration("Graph database username is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(StoreError::Configuration("Graph database password is required".to_string()));
        }
        if self.pool_size == 0 {
            return Err(StoreError::Configuration("Pool size must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = StoreConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.uri, "bolt://localhost:7687");
        assert_eq!(config.username, "neo4j");
        assert_eq!(config.password, "password");
        assert_eq!(config.backend, BackendPreference::Auto);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_overrides_from_environment() {
        let config = StoreConfig::from_lookup(lookup_from(&[
            ("NEO4J_URI", "bolt://graph.internal:7687"),
            ("NEO4J_USERNAME", "survey"),
            ("NEO4J_PASSWORD", "s3cret"),
            ("NEO4J_DATABASE", "community"),
            ("NEO4J_CONNECT_TIMEOUT_SECS", "2"),
            ("EDUMESH_GRAPH_BACKEND", "mock"),
        ]))
        .unwrap();

        assert_eq!(config.uri, "bolt://graph.internal:7687");
        assert_eq!(config.username, "survey");
        assert_eq!(config.password, "s3cret");
        assert_eq!(config.database.as_deref(), Some("community"));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.backend, BackendPreference::Mock);
    }

    #[test]
    fn test_neo4j_user_takes_precedence() {
        let config = StoreConfig::from_lookup(lookup_from(&[
            ("NEO4J_USER", "primary"),
            ("NEO4J_USERNAME", "secondary"),
        ]))
        .unwrap();
        assert_eq!(config.username, "primary");
    }

    #[test]
    fn test_empty_password_is_fatal() {
        let err = StoreConfig::from_lookup(lookup_from(&[("NEO4J_PASSWORD", "")])).unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));
    }

    #[test]
    fn test_unknown_backend_is_fatal() {
        let err = StoreConfig::from_lookup(lookup_from(&[("EDUMESH_GRAPH_BACKEND", "sqlite")])).unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));
    }

    #[test]
    fn test_invalid_pool_size_keeps_default() {
        let config = StoreConfig::from_lookup(lookup_from(&[("NEO4J_POOL_SIZE", "many")])).unwrap();
        assert_eq!(config.pool_size, 10);
    }
}
