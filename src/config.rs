use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete runtime configuration, read from a TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub database_path: PathBuf,
    pub retry: RetryPolicy,
    pub batch: BatchSettings,
    pub reconcile: ReconcileSettings,
    pub background: BackgroundSettings,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./data/photo-sync.db"),
            retry: RetryPolicy::default(),
            batch: BatchSettings::default(),
            reconcile: ReconcileSettings::default(),
            background: BackgroundSettings::default(),
        }
    }
}

impl SyncConfig {
    /// Loads the config file if it exists, otherwise returns defaults
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: SyncConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.retry.max_attempts == 0 {
            return Err(AppError::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.retry.delays_secs.is_empty() {
            return Err(AppError::Config("retry.delays_secs must not be empty".into()));
        }
        if self.batch.max_concurrent == 0 {
            return Err(AppError::Config("batch.max_concurrent must be at least 1".into()));
        }
        if self.reconcile.remote_page_size == 0 {
            return Err(AppError::Config("reconcile.remote_page_size must be at least 1".into()));
        }
        Ok(())
    }
}

/// Bounded retry schedule for a single photo upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delays_secs: Vec<u64>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delays_secs: vec![5, 15, 60],
        }
    }
}

impl RetryPolicy {
    /// Delay slept after the failed attempt `attempt` (0-based).
    /// Attempts beyond the schedule reuse its last entry.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let idx = (attempt as usize).min(self.delays_secs.len().saturating_sub(1));
        Duration::from_secs(self.delays_secs.get(idx).copied().unwrap_or(0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    pub max_concurrent: usize,
    pub retry_limit: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            retry_limit: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
    /// Remote items requested per listing call
    pub remote_page_size: u32,
    /// Upper bound on remote items fetched across all pages
    pub max_remote_photos: u32,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            remote_page_size: 1_000,
            max_remote_photos: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundSettings {
    pub interval_secs: u64,
    /// Reconcile on every Nth cycle, 0 disables it
    pub reconcile_every: u64,
    pub reconcile_dry_run: bool,
    pub pending_limit: usize,
    /// Syncing photos untouched this long are treated as interrupted
    pub stale_sync_secs: u64,
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            reconcile_every: 12,
            reconcile_dry_run: true,
            pending_limit: 50,
            stale_sync_secs: 900,
        }
    }
}
