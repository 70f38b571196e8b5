use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::{flog_debug, Error, Result};

/// Runtime settings for the coordinators, the pipeline and the CLI.
///
/// Loaded from `~/.fleet/fleet.toml`; every field has a default so a
/// partial file (or none at all) is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sub-workers owned by each coordinator.
    pub pool_size: usize,
    /// Fan-out requested by each stage dispatch.
    pub default_fanout: usize,
    /// Simulated work latency of a sub-worker invocation.
    pub worker_latency_ms: u64,
    /// Per sub-worker wait bound. `None` waits indefinitely.
    pub dispatch_timeout_ms: Option<u64>,
    /// Invocations kept in each sub-worker's history.
    pub worker_history: usize,
    /// Records kept in each coordinator's learning history.
    pub learning_history: usize,
    /// Extra executor attempts for a subtask that did not succeed.
    pub max_retries: u32,
    /// Base delay of the executor's exponential backoff.
    pub retry_backoff_ms: u64,
    /// Where the JSON record store lives. Defaults to ~/.fleet/records.
    pub store_dir: Option<String>,
    /// Period of the automation cycle.
    pub auto_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pool_size: 10,
            default_fanout: 3,
            worker_latency_ms: 100,
            dispatch_timeout_ms: None,
            worker_history: 100,
            learning_history: 1000,
            max_retries: 0,
            retry_backoff_ms: 100,
            store_dir: None,
            auto_interval_secs: 300,
        }
    }
}

impl Config {
    pub fn fleet_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".fleet"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::fleet_dir()?.join("fleet.toml"))
    }

    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.store_dir {
            Some(dir) => Ok(expand_tilde(dir)),
            None => Ok(Self::fleet_dir()?.join("records")),
        }
    }

    pub fn worker_latency(&self) -> Duration {
        Duration::from_millis(self.worker_latency_ms)
    }

    pub fn dispatch_timeout(&self) -> Option<Duration> {
        self.dispatch_timeout_ms.map(Duration::from_millis)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn auto_interval(&self) -> Duration {
        Duration::from_secs(self.auto_interval_secs)
    }

    /// Reject settings the coordinators cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::Validation("pool_size must be at least 1".into()));
        }
        if self.learning_history == 0 {
            return Err(Error::Validation(
                "learning_history must be at least 1".into(),
            ));
        }
        if self.auto_interval_secs == 0 {
            return Err(Error::Validation(
                "auto_interval_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        flog_debug!("config", "Config::load path={}", path.display());
        if !path.exists() {
            flog_debug!("config", "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(&path)?)?;
        config.validate()?;
        flog_debug!(
            "config",
            "Config loaded: pool_size={}, fanout={}, timeout={:?}, retries={}",
            config.pool_size,
            config.default_fanout,
            config.dispatch_timeout_ms,
            config.max_retries
        );
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let fleet_dir = Self::fleet_dir()?;
        if !fleet_dir.exists() {
            flog_debug!("config", "Creating fleet directory");
            fs::create_dir_all(&fleet_dir)?;
        }
        let path = Self::config_path()?;
        fs::write(&path, toml::to_string_pretty(self)?)?;
        flog_debug!("config", "Config saved to {}", path.display());
        Ok(())
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
