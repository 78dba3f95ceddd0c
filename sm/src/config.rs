//! Configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::machine::MachineConfig;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR); the CLI flag wins over this
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// State machine settings
    pub machine: MachineConfig,
}

impl Config {
    /// Load configuration with fallback chain
    ///
    /// An explicit path must load. Otherwise the first readable file from
    /// [`Config::search_paths`] wins, then defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            debug!(path = %path.display(), "Config::load: explicit path");
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::search_paths() {
            if !candidate.exists() {
                debug!(path = %candidate.display(), "Config::load: not found, skipping");
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => return Ok(config),
                Err(e) => warn!(path = %candidate.display(), error = %e, "Config::load: unreadable, skipping"),
            }
        }

        debug!("Config::load: no config file found, using defaults");
        Ok(Self::default())
    }

    /// Implicit config locations, most specific first
    ///
    /// `.statemachine.yml` in the working directory, then
    /// `statemachine/statemachine.yml` under the user config dir.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".statemachine.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("statemachine").join("statemachine.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        debug!(path = %path.as_ref().display(), initial = %config.machine.initial_state, "Config::load_from_file: loaded");
        Ok(config)
    }

    /// Write this config as YAML, e.g. to seed `.statemachine.yml`
    pub fn save(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "Config::save: called");
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs::write(path, content).context(format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }
}
