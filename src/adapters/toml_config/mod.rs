// TOML config adapter - Configuration files in TOML

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config_initialization::ConfigFile;
use crate::domain::errors::*;
use crate::ports::*;

/// File name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "reelsmith.toml";

/// TOML configuration adapter
#[derive(Debug, Clone, Default)]
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Parse a config document
    pub fn parse(content: &str) -> Result<ConfigFile, DomainError> {
        toml::from_str(content)
            .map_err(|e| DomainError::Config(format!("Failed to parse TOML config: {}", e)))
    }

    /// Serialize a config document
    pub fn render(config: &ConfigFile) -> Result<String, DomainError> {
        toml::to_string_pretty(config)
            .map_err(|e| DomainError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Per-user config path: `$XDG_CONFIG_HOME/reelsmith/config.toml` or `~/.config/...`
    fn user_config_path() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
        Some(base.join("reelsmith").join("config.toml"))
    }
}

impl ConfigPort for TomlConfigAdapter {
    fn load_config(&self, path: &Path) -> Result<ConfigFile, DomainError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DomainError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        debug!("Parsing config file {}", path.display());
        Self::parse(&content)
    }

    fn default_config_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from(CONFIG_FILE_NAME),
            PathBuf::from("config").join(CONFIG_FILE_NAME),
        ];
        if let Some(user) = Self::user_config_path() {
            paths.push(user);
        }
        paths
    }
}
