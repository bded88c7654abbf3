//! Server configuration, loadable from TOML.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use skirmish_transport::DEFAULT_MAX_LINE_LEN;
use skirmish_world::Locations;

/// Default listen address.
pub const DEFAULT_BIND: &str = "127.0.0.1:65432";

/// Errors from loading or validating a [`ServerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML, or a field has the wrong shape. Bad
    /// location lists land here too.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The file parsed but a value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Everything a server needs to start.
///
/// Every field has a default, so an empty file is a valid config:
///
/// ```toml
/// bind = "0.0.0.0:65432"
/// locations = ["Tavern", "Forest", "Cave"]
/// max_line_len = 1024
/// log_filter = "info,skirmish=debug"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: String,

    /// Known locations. The first is where new players spawn.
    pub locations: Locations,

    /// Longest inbound line, in bytes. Longer lines are dropped.
    pub max_line_len: usize,

    /// `tracing` filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_owned(),
            locations: Locations::default(),
            max_line_len: DEFAULT_MAX_LINE_LEN,
            log_filter: "info".to_owned(),
        }
    }
}

impl ServerConfig {
    /// Parses and validates a config from TOML text.
    ///
    /// # Errors
    /// [`ConfigError::Parse`] or [`ConfigError::Invalid`].
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    ///
    /// # Errors
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Checks values the type system does not.
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind.trim().is_empty() {
            return Err(ConfigError::Invalid("bind must not be empty".into()));
        }
        if self.max_line_len == 0 {
            return Err(ConfigError::Invalid("max_line_len must be positive".into()));
        }
        Ok(())
    }
}
