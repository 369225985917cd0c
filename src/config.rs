//! Runtime configuration read from the environment.
//!
//! `main` loads `.env` with dotenvy first, so the same `VITE_*` variables the
//! web console uses are honoured as fallbacks.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::api::retry::{Backoff, RetryPolicy, DEFAULT_RETRIES};
use crate::session::{CredentialStore, FileStore, KeychainStore, MemoryStore};

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";
pub const DEFAULT_AI_SERVICE_BASE: &str = "http://0.0.0.0:8001";

const DEFAULT_RETRY_BASE_MS: u64 = 1000;
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be an http(s) URL, got {value:?}")]
    InvalidUrl { var: &'static str, value: String },

    #[error("CONDO_SESSION_STORE must be file, keychain or memory, got {0:?}")]
    UnknownStore(String),
}

/// Where the session credential is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    File,
    Keychain,
    Memory,
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StoreKind::File),
            "keychain" => Ok(StoreKind::Keychain),
            "memory" => Ok(StoreKind::Memory),
            other => Err(ConfigError::UnknownStore(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Backend root, without the `/api` prefix.
    pub api_base: String,
    /// AI microservice root.
    pub ai_service_base: String,
    pub retries: u32,
    pub retry_base: Duration,
    pub timeout: Duration,
    pub store: StoreKind,
    pub session_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            ai_service_base: DEFAULT_AI_SERVICE_BASE.to_string(),
            retries: DEFAULT_RETRIES,
            retry_base: Duration::from_millis(DEFAULT_RETRY_BASE_MS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            store: StoreKind::default(),
            session_file: FileStore::default_path(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        // CONDO_API_BASE > VITE_API_BASE > localhost default
        let api_base = match get("CONDO_API_BASE").or_else(|| get("VITE_API_BASE")) {
            Some(value) => parse_url("CONDO_API_BASE", value)?,
            None => defaults.api_base,
        };
        let ai_service_base = match get("CONDO_AI_SERVICE_BASE").or_else(|| get("VITE_AI_SERVICE_BASE")) {
            Some(value) => parse_url("CONDO_AI_SERVICE_BASE", value)?,
            None => defaults.ai_service_base,
        };

        let retries = match get("CONDO_HTTP_RETRIES") {
            Some(value) => parse_number("CONDO_HTTP_RETRIES", &value)
                .and_then(|n| u32::try_from(n).map_err(|_| invalid("CONDO_HTTP_RETRIES", &value)))?,
            None => defaults.retries,
        };
        let retry_base = match get("CONDO_RETRY_BASE_MS") {
            Some(value) => Duration::from_millis(parse_number("CONDO_RETRY_BASE_MS", &value)?),
            None => defaults.retry_base,
        };
        let timeout = match get("CONDO_HTTP_TIMEOUT_SECS") {
            Some(value) => Duration::from_secs(parse_number("CONDO_HTTP_TIMEOUT_SECS", &value)?),
            None => defaults.timeout,
        };

        let store = match get("CONDO_SESSION_STORE") {
            Some(value) => value.parse()?,
            None => defaults.store,
        };
        let session_file = get("CONDO_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.session_file);

        Ok(Self {
            api_base,
            ai_service_base,
            retries,
            retry_base,
            timeout,
            store,
            session_file,
        })
    }

    /// `<api_base>/api`, the prefix every backend path hangs off.
    pub fn api_prefix(&self) -> String {
        format!("{}/api", self.api_base)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries).with_backoff(Backoff::exponential(self.retry_base))
    }

    pub fn credential_store(&self) -> Box<dyn CredentialStore> {
        match self.store {
            StoreKind::File => Box::new(FileStore::new(self.session_file.clone())),
            StoreKind::Keychain => Box::new(KeychainStore::new()),
            StoreKind::Memory => Box::new(MemoryStore::default()),
        }
    }
}

fn invalid(var: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidNumber {
        var,
        value: value.to_string(),
    }
}

fn parse_number(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| invalid(var, value))
}

fn parse_url(var: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Err(ConfigError::InvalidUrl { var, value })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config(&[]).unwrap();
        assert_eq!(config.api_prefix(), "http://127.0.0.1:8000/api");
        assert_eq!(config.ai_service_base, "http://0.0.0.0:8001");
        assert_eq!(config.retries, 2);
        assert_eq!(config.retry_base, Duration::from_secs(1));
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.store, StoreKind::File);
    }

    #[test]
    fn primary_variable_wins_over_vite_fallback() {
        let config = config(&[
            ("VITE_API_BASE", "http://vite:8000"),
            ("CONDO_API_BASE", "https://condo.example.bo/"),
            ("VITE_AI_SERVICE_BASE", "http://ai:8001"),
        ])
        .unwrap();
        assert_eq!(config.api_base, "https://condo.example.bo");
        assert_eq!(config.ai_service_base, "http://ai:8001");
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = config(&[("CONDO_API_BASE", "  "), ("VITE_API_BASE", "http://vite:8000")]).unwrap();
        assert_eq!(config.api_base, "http://vite:8000");
    }

    #[test]
    fn numbers_and_store_are_parsed() {
        let config = config(&[
            ("CONDO_HTTP_RETRIES", "0"),
            ("CONDO_RETRY_BASE_MS", "250"),
            ("CONDO_SESSION_STORE", "Memory"),
            ("CONDO_SESSION_FILE", "/tmp/condo.json"),
        ])
        .unwrap();
        assert_eq!(config.retry_policy().max_attempts(), 1);
        assert_eq!(config.retry_base, Duration::from_millis(250));
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.session_file, PathBuf::from("/tmp/condo.json"));
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(matches!(
            config(&[("CONDO_HTTP_RETRIES", "-1")]),
            Err(ConfigError::InvalidNumber { var: "CONDO_HTTP_RETRIES", .. })
        ));
        assert!(matches!(
            config(&[("CONDO_SESSION_STORE", "redis")]),
            Err(ConfigError::UnknownStore(_))
        ));
        assert!(matches!(
            config(&[("CONDO_API_BASE", "127.0.0.1:8000")]),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }
}
