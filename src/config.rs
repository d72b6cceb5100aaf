use serde::Deserialize;
use std::path::Path;

use crate::application::errors::{PipelineError, Result};
use crate::application::pipeline::SinkMode;
use crate::domain::value_objects::TypesMap;
use crate::infrastructure::archive::{ArchiveOptions, Compression, Strategy, DEFAULT_QUEUE_CAPACITY};

const MAX_QUEUE_CAPACITY: usize = 65_536;
const MAX_WORKERS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub strategy: Strategy,
    pub compression: Compression,
    /// Concurrent sink workers; 0 writes sequentially.
    pub workers: usize,
    pub queue_capacity: usize,
    pub filter_empty: bool,
    pub log_level: String,
    /// Field name → feature type used by the logical → wire conversion.
    pub types: TypesMap,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: Strategy::Auto,
            compression: Compression::Auto,
            workers: 0,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            filter_empty: false,
            log_level: "info".to_string(),
            types: TypesMap::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; unset or unparsable values
    /// keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            strategy: lookup("TARPIPE_STRATEGY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.strategy),
            compression: lookup("TARPIPE_COMPRESSION")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.compression),
            workers: lookup("TARPIPE_WORKERS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.workers),
            queue_capacity: lookup("TARPIPE_QUEUE_CAPACITY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.queue_capacity),
            filter_empty: lookup("TARPIPE_FILTER_EMPTY")
                .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.filter_empty),
            log_level: lookup("TARPIPE_LOG_LEVEL").unwrap_or(defaults.log_level),
            types: defaults.types,
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| PipelineError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.queue_capacity == 0 || self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(format!(
                "queue_capacity must be between 1 and {MAX_QUEUE_CAPACITY}"
            ));
        }

        if self.workers > MAX_WORKERS {
            return Err(format!("workers must be at most {MAX_WORKERS}"));
        }

        if self.log_level.trim().is_empty() {
            return Err("log_level cannot be empty".to_string());
        }

        Ok(())
    }

    pub fn archive_options(&self) -> ArchiveOptions {
        ArchiveOptions::default()
            .with_strategy(self.strategy)
            .with_compression(self.compression)
            .with_queue_capacity(self.queue_capacity)
    }

    pub fn sink_mode(&self) -> SinkMode {
        SinkMode::from_workers(self.workers, self.queue_capacity)
    }
}
