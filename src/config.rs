//! Engine configuration loading from environment variables or a TOML file.
//!
//! Values come from `FAIRGATE_*` environment variables with defaults.
//! Invalid values fall back to defaults without crashing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `FAIRGATE_NAME` | default | Queue set name used in logs and metrics |
//! | `FAIRGATE_QUEUES` | 64 | Number of queues (0 = no queuing) |
//! | `FAIRGATE_QUEUE_LENGTH_LIMIT` | 50 | Max waiting requests per queue (0 = no queuing) |
//! | `FAIRGATE_HAND_SIZE` | 8 | Queues dealt to each flow |
//! | `FAIRGATE_REQUEST_WAIT_LIMIT_MS` | 15000 | Max time a request waits in a queue |
//! | `FAIRGATE_CONCURRENCY_LIMIT` | 100 | Seats available for execution |
//! | `FAIRGATE_LOG_LEVEL` | info | `EnvFilter` directive |
//! | `FAIRGATE_LOG_FORMAT` | json | `json` or `pretty` |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scheduler::{DispatchingConfig, QueuingConfig};
use crate::telemetry::{LogConfig, LogFormat};

pub const ENV_NAME: &str = "FAIRGATE_NAME";
pub const ENV_QUEUES: &str = "FAIRGATE_QUEUES";
pub const ENV_QUEUE_LENGTH_LIMIT: &str = "FAIRGATE_QUEUE_LENGTH_LIMIT";
pub const ENV_HAND_SIZE: &str = "FAIRGATE_HAND_SIZE";
pub const ENV_REQUEST_WAIT_LIMIT_MS: &str = "FAIRGATE_REQUEST_WAIT_LIMIT_MS";
pub const ENV_CONCURRENCY_LIMIT: &str = "FAIRGATE_CONCURRENCY_LIMIT";
pub const ENV_LOG_LEVEL: &str = "FAIRGATE_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "FAIRGATE_LOG_FORMAT";

/// Flat, serializable summary of the effective values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub name: String,
    pub queues: usize,
    pub queue_length_limit: usize,
    pub hand_size: usize,
    pub request_wait_limit_ms: u64,
    pub concurrency_limit: u32,
    pub queuing_enabled: bool,
    pub log_level: String,
    pub log_format: String,
}

/// Everything needed to stand up one queue set plus its logging.
///
/// Field names double as the TOML keys accepted by [`load_file`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub name: String,
    pub queues: usize,
    pub queue_length_limit: usize,
    pub hand_size: usize,
    pub request_wait_limit_ms: u64,
    pub concurrency_limit: u32,
    pub log_level: String,
    pub log_format: LogFormat,
    pub log_file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let queuing = QueuingConfig::default();
        Self {
            name: queuing.name,
            queues: queuing.desired_num_queues,
            queue_length_limit: queuing.queue_length_limit,
            hand_size: queuing.hand_size,
            request_wait_limit_ms: queuing.request_wait_limit.as_millis() as u64,
            concurrency_limit: DispatchingConfig::default().concurrency_limit,
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            log_file: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Parse a `usize` env var, returning `default` on missing or invalid.
fn parse_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a `u32` env var, returning `default` on missing or invalid.
fn parse_u32(key: &str, default: u32) -> u32 {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<u32>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a `u64` env var, returning `default` on missing or invalid.
fn parse_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

fn parse_string(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(val) if !val.trim().is_empty() => val.trim().to_string(),
        _ => default.to_string(),
    }
}

/// Load configuration from environment variables.
///
/// Missing or invalid values fall back to defaults without panicking.
pub fn load() -> EngineConfig {
    let defaults = EngineConfig::default();
    let log_format = std::env::var(ENV_LOG_FORMAT)
        .ok()
        .and_then(|v| v.parse::<LogFormat>().ok())
        .unwrap_or(defaults.log_format);

    EngineConfig {
        name: parse_string(ENV_NAME, &defaults.name),
        queues: parse_usize(ENV_QUEUES, defaults.queues),
        queue_length_limit: parse_usize(ENV_QUEUE_LENGTH_LIMIT, defaults.queue_length_limit),
        hand_size: parse_usize(ENV_HAND_SIZE, defaults.hand_size),
        request_wait_limit_ms: parse_u64(ENV_REQUEST_WAIT_LIMIT_MS, defaults.request_wait_limit_ms),
        concurrency_limit: parse_u32(ENV_CONCURRENCY_LIMIT, defaults.concurrency_limit),
        log_level: parse_string(ENV_LOG_LEVEL, &defaults.log_level),
        log_format,
        log_file: None,
    }
    .with_floors()
}

/// Load configuration from a TOML file. Missing keys take defaults.
pub fn load_file(path: &Path) -> Result<EngineConfig, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: EngineConfig = toml::from_str(&text).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(config.with_floors())
}

impl EngineConfig {
    /// Raise values that can never be meaningful to their floor.
    ///
    /// Zero queues and a zero length limit stay as they are since both mean
    /// "no queuing". Hand size versus queue count is left to validation.
    fn with_floors(mut self) -> Self {
        self.hand_size = self.hand_size.max(1);
        self.request_wait_limit_ms = self.request_wait_limit_ms.max(1);
        self.concurrency_limit = self.concurrency_limit.max(1);
        self
    }

    pub fn queuing(&self) -> QueuingConfig {
        QueuingConfig {
            name: self.name.clone(),
            desired_num_queues: self.queues,
            queue_length_limit: self.queue_length_limit,
            hand_size: self.hand_size,
            request_wait_limit: Duration::from_millis(self.request_wait_limit_ms),
        }
    }

    pub fn dispatching(&self) -> DispatchingConfig {
        DispatchingConfig {
            concurrency_limit: self.concurrency_limit,
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            format: self.log_format,
            level: self.log_level.clone(),
            output_path: self.log_file.clone(),
        }
    }

    /// Return a serializable summary of all effective values.
    pub fn effective_config(&self) -> EffectiveConfig {
        EffectiveConfig {
            name: self.name.clone(),
            queues: self.queues,
            queue_length_limit: self.queue_length_limit,
            hand_size: self.hand_size,
            request_wait_limit_ms: self.request_wait_limit_ms,
            concurrency_limit: self.concurrency_limit,
            queuing_enabled: !self.queuing().queuing_disabled(),
            log_level: self.log_level.clone(),
            log_format: self.log_format.to_string(),
        }
    }
}
