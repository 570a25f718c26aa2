//! Client configuration
//!
//! Resolved in this order (first found wins):
//! 1. Environment variables (REROUTE_*), when [`ClientConfig::with_env_overrides`] is used
//! 2. Config file (TOML)
//! 3. Default values

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::request::Timeout;
use crate::ConfigError;

/// Environment variable prefix
const ENV_PREFIX: &str = "REROUTE";

/// Default idle time before a pooled connection is closed
const DEFAULT_POOL_IDLE_SECS: u64 = 90;

/// How an [`AsyncClient`](crate::AsyncClient) reaches servers when no proxy is set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Reuse connections through a pool
    #[default]
    Pooled,
    /// Open a fresh connection per request
    Direct,
}

/// Client configuration (parsed from TOML, can be overridden by env)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub mode: Mode,

    /// Outbound HTTP proxy, e.g. "http://127.0.0.1:3128"
    pub proxy: Option<String>,

    /// Default read timeout for requests that carry none
    pub read_timeout_ms: Option<u64>,

    /// Default connect timeout for requests that carry none
    pub connect_timeout_ms: Option<u64>,

    /// Idle pooled connections are closed after this long (None = never)
    pub pool_idle_timeout_secs: Option<u64>,

    pub pool_max_idle_per_host: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            proxy: None,
            read_timeout_ms: None,
            connect_timeout_ms: None,
            pool_idle_timeout_secs: Some(DEFAULT_POOL_IDLE_SECS),
            pool_max_idle_per_host: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply REROUTE_* environment variables on top of this configuration
    pub fn with_env_overrides(self) -> Self {
        self.apply_env(|name| env::var(format!("{}_{}", ENV_PREFIX, name)).ok())
    }

    fn apply_env(mut self, get_env: impl Fn(&str) -> Option<String>) -> Self {
        let get_env_u64 = |name: &str| get_env(name).and_then(|v| v.parse().ok());

        if let Some(proxy) = get_env("PROXY") {
            self.proxy = Some(proxy);
        }
        if let Some(ms) = get_env_u64("READ_TIMEOUT_MS") {
            self.read_timeout_ms = Some(ms);
        }
        if let Some(ms) = get_env_u64("CONNECT_TIMEOUT_MS") {
            self.connect_timeout_ms = Some(ms);
        }
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn pool_idle_timeout(&self) -> Option<Duration> {
        self.pool_idle_timeout_secs.map(Duration::from_secs)
    }

    /// Timeouts given to requests that carry none of their own
    pub fn default_timeout(&self) -> Timeout {
        Timeout {
            connect: self.connect_timeout(),
            read: self.read_timeout(),
        }
    }
}
