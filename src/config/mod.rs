// Configuration management module
// TOML settings for storage, the REST listener and logging

pub mod settings;


pub use settings::{
    Config, ConfigError, HttpConfig, LoggingConfig, StorageBackend, StorageConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
