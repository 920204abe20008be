//! Configuration module - environment variables and the plugin config file

pub mod plugin;

pub use plugin::{FlagQuotas, PluginConfig, ThrowQuota, CONFIG_VERSION};

use std::env;
use std::path::PathBuf;

use crate::util::time::DEFAULT_TICK_RATE;

/// Process configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Plugin options file, defaults are used when unset
    pub plugin_config_path: Option<PathBuf>,
    /// Directory holding the shared menu config files
    pub menu_shared_dir: Option<PathBuf>,
    /// Directory the menu config files are copied into
    pub menu_target_dir: Option<PathBuf>,
    /// Host tick rate
    pub tick_rate: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let tick_rate = match env::var("KNIVES_TICK_RATE") {
            Ok(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|rate| *rate > 0)
                .ok_or(ConfigError::InvalidValue("KNIVES_TICK_RATE"))?,
            Err(_) => DEFAULT_TICK_RATE,
        };

        Ok(Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            plugin_config_path: env::var_os("KNIVES_CONFIG").map(PathBuf::from),
            menu_shared_dir: env::var_os("KNIVES_MENU_SHARED_DIR").map(PathBuf::from),
            menu_target_dir: env::var_os("KNIVES_MENU_TARGET_DIR").map(PathBuf::from),
            tick_rate,
        })
    }

    /// Load the plugin options, falling back to defaults without a path
    pub fn load_plugin_config(&self) -> Result<PluginConfig, ConfigError> {
        match &self.plugin_config_path {
            Some(path) => PluginConfig::from_file(path),
            None => Ok(PluginConfig::default()),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(&'static str),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config file: {0}")]
    Parse(#[from] serde_json::Error),
}
