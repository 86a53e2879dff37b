use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// How the dispatch loop hands objects to the event handler
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// One event per iteration, one object per callback
    #[default]
    Single,
    /// Same-type batches on a fixed tick, a list of objects per callback
    Batched,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DispatchConfig {
    #[serde(default)]
    pub mode: DispatchMode,

    /// Upper bound of events popped per batched iteration
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,

    /// Tick of the batched loop (milliseconds)
    #[serde(default = "default_batch_interval_ms")]
    pub batch_interval_ms: u64,

    /// How long startup waits for the resource cache to report ready
    /// (milliseconds). Timing out counts as a failed sync.
    #[serde(default = "default_cache_sync_timeout_ms")]
    pub cache_sync_timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            mode: DispatchMode::default(),
            max_batch: default_max_batch(),
            batch_interval_ms: default_batch_interval_ms(),
            cache_sync_timeout_ms: default_cache_sync_timeout_ms(),
        }
    }
}

impl DispatchConfig {
    pub fn batched(max_batch: usize) -> Self {
        Self {
            mode: DispatchMode::Batched,
            max_batch,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.mode == DispatchMode::Batched {
            if self.max_batch == 0 {
                return Err(Error::Config(ConfigError::Message(
                    "dispatch.max_batch must be greater than 0 in batched mode".into(),
                )));
            }
            if self.batch_interval_ms < 1 {
                return Err(Error::Config(ConfigError::Message(
                    "dispatch.batch_interval_ms must be at least 1ms".into(),
                )));
            }
        }

        if self.cache_sync_timeout_ms < 1 {
            return Err(Error::Config(ConfigError::Message(
                "dispatch.cache_sync_timeout_ms must be at least 1ms".into(),
            )));
        }

        Ok(())
    }

    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_ms)
    }

    pub fn cache_sync_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_sync_timeout_ms)
    }
}

fn default_max_batch() -> usize {
    50
}
// in ms
fn default_batch_interval_ms() -> u64 {
    1000
}
fn default_cache_sync_timeout_ms() -> u64 {
    30_000
}
