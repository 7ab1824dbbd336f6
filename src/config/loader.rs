//! Configuration File Loading
//!
//! Finds and parses the runner configuration (TOML or JSON) from an
//! explicit path or the usual search locations, falling back to defaults
//! when no file exists.

use super::RunnerConfig;
use crate::error::{Error, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "PROMPTBRIDGE_CONFIG";

/// File name looked up in each search directory
pub const CONFIG_FILE_NAME: &str = "promptbridge.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Pick the format from a file extension; TOML unless it says json
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Json => "JSON",
        }
    }
}

/// Configuration file loader
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Candidate files, in priority order
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader with the default search paths
    pub fn new() -> Self {
        Self {
            search_paths: Self::default_search_paths(),
        }
    }

    /// Create a loader with explicit search paths
    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// `$PROMPTBRIDGE_CONFIG`, `./promptbridge.toml`, then the user config dir
    pub fn default_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(explicit) = env::var(CONFIG_ENV_VAR) {
            if !explicit.is_empty() {
                paths.push(PathBuf::from(explicit));
            }
        }

        if let Ok(cwd) = env::current_dir() {
            paths.push(cwd.join(CONFIG_FILE_NAME));
        }

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("promptbridge").join("config.toml"));
        }

        paths
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Load configuration from the default locations
    pub fn load() -> Result<RunnerConfig> {
        Self::new().load_first()
    }

    /// First existing file wins; no file at all yields defaults
    pub fn load_first(&self) -> Result<RunnerConfig> {
        for path in &self.search_paths {
            if path.is_file() {
                info!("Loading configuration from {}", path.display());
                return Self::load_from_path(path);
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(RunnerConfig::default())
    }

    /// Load and validate a specific file
    pub fn load_from_path(path: &Path) -> Result<RunnerConfig> {
        let content = fs::read_to_string(path).map_err(|e| Error::ConfigLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config = Self::parse(&content, ConfigFormat::from_path(path))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration text
    pub fn parse(content: &str, format: ConfigFormat) -> Result<RunnerConfig> {
        match format {
            ConfigFormat::Toml => {
                toml::from_str(content).map_err(|e| Error::ConfigParseFailed {
                    format: format.name().to_string(),
                    reason: e.to_string(),
                })
            }
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|e| Error::ConfigParseFailed {
                    format: format.name().to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Write a configuration file, format chosen by extension
    pub fn save_to_path(config: &RunnerConfig, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let format = ConfigFormat::from_path(path);
        let content = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(config).map_err(|e| {
                Error::ConfigSerializationFailed {
                    format: format.name().to_string(),
                    reason: e.to_string(),
                }
            })?,
            ConfigFormat::Toml => {
                toml::to_string_pretty(config).map_err(|e| Error::ConfigSerializationFailed {
                    format: format.name().to_string(),
                    reason: e.to_string(),
                })?
            }
        };

        fs::write(path, content)?;
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
