//! Configuration for watch sessions.
//!
//! This module provides the per-session configuration structures with
//! their defaults, eager validation, TOML file loading, and environment
//! variable overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::error::TriggerError;
use crate::events::EventMask;

fn default_true() -> bool {
    true
}

fn default_aggregate() -> usize {
    1
}

fn default_stop_polling_rate() -> usize {
    2
}

fn default_files_key() -> String {
    "files".to_string()
}

fn default_lines_key() -> String {
    "lines".to_string()
}

fn default_poll_ms() -> u64 {
    500
}

/// Configuration for a directory watch session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirWatchConfig {
    /// Absolute path of the directory to watch.
    pub path: PathBuf,
    /// Name of the downstream job triggered per batch.
    pub job: String,
    /// Watch subdirectories as well.
    #[serde(default = "default_true")]
    pub recursive: bool,
    /// Listen for file creation events.
    #[serde(default)]
    pub on_create: bool,
    /// Listen for file closing events.
    #[serde(default = "default_true")]
    pub on_close: bool,
    /// Listen for file deletion events.
    #[serde(default)]
    pub on_delete: bool,
    /// Listen for file move events.
    #[serde(default)]
    pub on_move: bool,
    /// Number of accepted events aggregated before a dispatch.
    #[serde(default = "default_aggregate")]
    pub aggregate: usize,
    /// Drop paths already present in the undispatched buffer.
    #[serde(default)]
    pub dedupe: bool,
    /// Seed the buffer with the files already under the path.
    #[serde(default)]
    pub use_existing: bool,
    /// Key under which the batch is stored in the dispatch payload.
    #[serde(default = "default_files_key")]
    pub data_key: String,
    /// Optional sleep after each delivered event, to throttle bursts.
    #[serde(default)]
    pub throttle_ms: Option<u64>,
    /// Number of observed events between stop-signal checks.
    #[serde(default = "default_stop_polling_rate")]
    pub stop_polling_rate: usize,
}

impl DirWatchConfig {
    pub fn new(path: PathBuf, job: String) -> Self {
        Self {
            path,
            job,
            recursive: true,
            on_create: false,
            on_close: true,
            on_delete: false,
            on_move: false,
            aggregate: 1,
            dedupe: false,
            use_existing: false,
            data_key: default_files_key(),
            throttle_ms: None,
            stop_polling_rate: 2,
        }
    }

    pub fn mask(&self) -> EventMask {
        EventMask::from_flags(self.on_create, self.on_close, self.on_delete, self.on_move)
    }

    pub fn throttle(&self) -> Option<Duration> {
        self.throttle_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), TriggerError> {
        if !self.path.is_absolute() {
            return Err(TriggerError::not_absolute(&self.path));
        }
        if self.job.is_empty() {
            return Err(TriggerError::config("job name must not be empty"));
        }
        if self.aggregate == 0 {
            return Err(TriggerError::config("aggregate must be at least 1"));
        }
        if self.stop_polling_rate == 0 {
            return Err(TriggerError::config("stop_polling_rate must be at least 1"));
        }
        Ok(())
    }

    /// Override numeric knobs from the environment.
    pub fn apply_env(&mut self) {
        if let Some(aggregate) = env_usize("FLOWTRIGGER_AGGREGATE") {
            self.aggregate = aggregate;
        }
        if let Some(rate) = env_usize("FLOWTRIGGER_STOP_POLLING_RATE") {
            self.stop_polling_rate = rate;
        }
        if let Some(ms) = env_u64("FLOWTRIGGER_THROTTLE_MS") {
            self.throttle_ms = Some(ms);
        }
    }
}

/// Configuration for a line watch session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineWatchConfig {
    /// Absolute path of the file to watch for new lines.
    pub path: PathBuf,
    /// Name of the downstream job triggered per batch.
    pub job: String,
    /// Number of lines aggregated before a dispatch.
    #[serde(default = "default_aggregate")]
    pub aggregate: usize,
    /// Start from the lines already in the file.
    #[serde(default)]
    pub use_existing: bool,
    /// With use_existing, dispatch the pre-existing lines immediately as a
    /// single batch regardless of the aggregation setting.
    #[serde(default = "default_true")]
    pub flush_existing: bool,
    /// Key under which the batch is stored in the dispatch payload.
    #[serde(default = "default_lines_key")]
    pub data_key: String,
    /// Sleep between unsuccessful read attempts.
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,
    /// Number of observed lines between stop-signal checks.
    #[serde(default = "default_stop_polling_rate")]
    pub stop_polling_rate: usize,
}

impl LineWatchConfig {
    pub fn new(path: PathBuf, job: String) -> Self {
        Self {
            path,
            job,
            aggregate: 1,
            use_existing: false,
            flush_existing: true,
            data_key: default_lines_key(),
            poll_ms: default_poll_ms(),
            stop_polling_rate: 2,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    pub fn validate(&self) -> Result<(), TriggerError> {
        if !self.path.is_absolute() {
            return Err(TriggerError::not_absolute(&self.path));
        }
        if self.job.is_empty() {
            return Err(TriggerError::config("job name must not be empty"));
        }
        if self.aggregate == 0 {
            return Err(TriggerError::config("aggregate must be at least 1"));
        }
        if self.stop_polling_rate == 0 {
            return Err(TriggerError::config("stop_polling_rate must be at least 1"));
        }
        Ok(())
    }

    pub fn apply_env(&mut self) {
        if let Some(aggregate) = env_usize("FLOWTRIGGER_AGGREGATE") {
            self.aggregate = aggregate;
        }
        if let Some(rate) = env_usize("FLOWTRIGGER_STOP_POLLING_RATE") {
            self.stop_polling_rate = rate;
        }
        if let Some(ms) = env_u64("FLOWTRIGGER_POLL_MS") {
            self.poll_ms = ms;
        }
    }
}

/// A TOML session file holding exactly one watch configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    pub watch_dir: Option<DirWatchConfig>,
    pub watch_lines: Option<LineWatchConfig>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, TriggerError> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|err| {
            TriggerError::config(format!("failed to parse {}: {}", path.display(), err))
        })
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|val| val.parse().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|val| val.parse().ok())
}
