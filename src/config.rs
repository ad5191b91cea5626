//! Persistent application configuration
//!
//! Stores device settings, validation targets, and test sizing in a JSON
//! file at `<data_dir>/accelbench/config.json`.

use accelbench_core::device::source::LcgSource;
use accelbench_core::{DeviceConfig, ValidationPlan, ValidationTargets};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

fn default_window_capacity() -> usize {
    accelbench_core::DEFAULT_WINDOW_CAPACITY
}

/// Validation run settings: every core enabled, a 2048-sample window at 2000 MB/s
fn default_device() -> DeviceConfig {
    DeviceConfig {
        window_size: 2048,
        active_cores: 8,
        data_rate: 2000,
        ..DeviceConfig::default()
    }
}

fn default_seed() -> u32 {
    LcgSource::DEFAULT_SEED
}

/// Persistent application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Device settings applied right after connecting
    #[serde(default = "default_device")]
    pub device: DeviceConfig,
    /// Pass/fail thresholds
    #[serde(default)]
    pub targets: ValidationTargets,
    /// Iteration counts, durations, and sampling intervals
    #[serde(default)]
    pub plan: ValidationPlan,
    /// Samples kept in the session window
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,
    /// Seed for the simulated device's variation source
    #[serde(default = "default_seed")]
    pub seed: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            targets: ValidationTargets::default(),
            plan: ValidationPlan::default(),
            window_capacity: default_window_capacity(),
            seed: default_seed(),
        }
    }
}

impl AppConfig {
    /// Config file path: `<data_dir>/accelbench/config.json`
    pub fn path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("accelbench")
            .join("config.json")
    }

    /// Load config from the default path, falling back to defaults on any error
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Load config from `path`, falling back to defaults on any error
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "Loaded config from disk");
                    config
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Save config to disk, creating parent directories if needed
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "Config saved to disk");
        Ok(())
    }

    /// Window capacity, with zero treated as the default
    pub fn window_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.window_capacity)
            .or_else(|| NonZeroUsize::new(default_window_capacity()))
            .unwrap_or(NonZeroUsize::MIN)
    }
}
