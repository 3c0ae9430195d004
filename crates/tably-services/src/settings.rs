//! Persisted engine configuration

use crate::PaginationPlanner;
use crate::pagination::DEFAULT_LARGE_TABLE_THRESHOLD;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tably_cache::CacheConfig;
use tably_monitor::MonitorConfig;

/// Engine configuration stored as JSON in the user's config directory.
///
/// Every section falls back to its defaults, so partial or older files load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub cache: CacheSettings,
    pub pagination: PaginationSettings,
    pub monitor: MonitorSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_secs: u64,
    pub max_entries: usize,
    /// Tables with at least this many rows are never cached
    pub size_threshold: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let config = CacheConfig::default();
        Self {
            ttl_secs: config.ttl.as_secs(),
            max_entries: config.max_entries,
            size_threshold: config.size_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationSettings {
    pub large_table_threshold: u64,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            large_table_threshold: DEFAULT_LARGE_TABLE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub query_threshold_ms: u64,
    pub operation_threshold_ms: u64,
    pub capacity: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        let config = MonitorConfig::default();
        Self {
            query_threshold_ms: config.query_threshold.as_millis() as u64,
            operation_threshold_ms: config.operation_threshold.as_millis() as u64,
            capacity: config.capacity,
        }
    }
}

impl EngineSettings {
    /// Load from the default location, or defaults if no file exists yet
    pub fn load() -> Result<Self> {
        Self::load_from(Self::settings_path()?)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine settings from {:?}", path))?;
        serde_json::from_str(&content).with_context(|| "Failed to parse engine settings JSON")
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(Self::settings_path()?)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write engine settings to {:?}", path))?;
        tracing::debug!("Saved engine settings to {:?}", path);
        Ok(())
    }

    pub fn settings_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not find config directory")?;
        Ok(config_dir.join("tably").join("engine.json"))
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new(
            Duration::from_secs(self.cache.ttl_secs),
            self.cache.max_entries,
            self.cache.size_threshold,
        )
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            query_threshold: Duration::from_millis(self.monitor.query_threshold_ms),
            operation_threshold: Duration::from_millis(self.monitor.operation_threshold_ms),
            capacity: self.monitor.capacity,
        }
    }

    pub fn pagination_planner(&self) -> PaginationPlanner {
        PaginationPlanner::new(self.pagination.large_table_threshold)
    }
}
