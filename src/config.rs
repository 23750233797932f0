//! Run and worker configuration
//!
//! One TOML file serves both roles: the coordinator reads the worker
//! list and polling settings, a worker process reads the store section.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dispatch::WorkerTarget;
use crate::error::{Error, Result};

/// Configuration for one coordinated run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Unit-of-work name dispatched to every partition
    pub unit: String,

    /// Worker base URLs, one per partition, in dispatch order
    pub workers: Vec<String>,

    /// Fixed interval between completion polls
    #[serde(with = "humantime_serde", default = "default_poll_interval")]
    pub poll_interval: Duration,

    /// Global deadline for the whole run
    #[serde(with = "humantime_serde", default = "default_deadline")]
    pub deadline: Duration,

    /// Shared execution store settings
    #[serde(default)]
    pub store: StoreConfig,
}

impl RunConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.unit.trim().is_empty() {
            return Err(Error::Config("unit name must not be empty".to_string()));
        }
        if self.workers.is_empty() {
            return Err(Error::Config(
                "at least one worker base URL must be configured".to_string(),
            ));
        }
        if let Some(bad) = self
            .workers
            .iter()
            .find(|url| !url.starts_with("http://") && !url.starts_with("https://"))
        {
            return Err(Error::Config(format!(
                "worker base URL '{bad}' must start with http:// or https://"
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll_interval must be positive".to_string()));
        }
        if self.deadline < self.poll_interval {
            return Err(Error::Config(
                "deadline must be at least one poll_interval".to_string(),
            ));
        }
        Ok(())
    }

    /// The fixed ordered dispatch target list
    pub fn targets(&self) -> Vec<WorkerTarget> {
        self.workers
            .iter()
            .map(|url| WorkerTarget {
                base_url: url.clone(),
            })
            .collect()
    }
}

/// Store backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// File-based store (default)
    #[default]
    File,
    /// Memory store (for testing)
    Memory,
    /// PostgreSQL store (requires the `postgres` feature)
    Postgres,
}

/// Shared execution store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Base directory for the file backend
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Connection URL for the postgres backend
    pub url: Option<String>,

    /// Connection pool size for database backends
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
            url: None,
            pool_size: default_pool_size(),
        }
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_deadline() -> Duration {
    Duration::from_secs(30)
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".gridrun")
}

fn default_pool_size() -> u32 {
    10
}
