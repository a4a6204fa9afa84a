//! Configuration read from an optional YAML file.

use crate::storage::DEFAULT_DATA_DIR;
use crate::types::{Collection, FieldSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "desk-search.yaml";
pub const DEFAULT_LATENCY_MS: u64 = 200;
pub const DEFAULT_WELCOME_DELAY_MS: u64 = 200;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_latency_ms() -> u64 {
    DEFAULT_LATENCY_MS
}

fn default_welcome_delay_ms() -> u64 {
    DEFAULT_WELCOME_DELAY_MS
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Simulated pause before resolving relationships, in milliseconds.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
    #[serde(default = "default_welcome_delay_ms")]
    pub welcome_delay_ms: u64,
    #[serde(default = "default_true")]
    pub include_relationships: bool,
    /// Additional searchable fields per collection.
    #[serde(default)]
    pub extra_fields: HashMap<Collection, Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: default_data_dir(),
            latency_ms: DEFAULT_LATENCY_MS,
            welcome_delay_ms: DEFAULT_WELCOME_DELAY_MS,
            include_relationships: true,
            extra_fields: HashMap::new(),
        }
    }
}

impl Config {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    pub fn welcome_delay(&self) -> Duration {
        Duration::from_millis(self.welcome_delay_ms)
    }

    /// Declared fields of `collection` plus any configured extras.
    pub fn field_set(&self, collection: Collection) -> FieldSet {
        let mut fields = FieldSet::declared(collection);
        if let Some(extra) = self.extra_fields.get(&collection) {
            fields.extend(extra);
        }
        fields
    }

    /// Relative data directories resolve against the config file's directory.
    fn anchor(mut self, base: &Path) -> Self {
        if self.data_dir.is_relative() {
            self.data_dir = base.join(&self.data_dir);
        }
        self
    }
}

/// Parse configuration from YAML text.
pub fn parse_config(path: &Path, content: &str) -> Result<Config, ConfigError> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(content).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Load configuration.
///
/// With an explicit path the file must exist. Without one,
/// `desk-search.yaml` in the working directory is used when present,
/// otherwise defaults apply.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let candidate = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !candidate.is_file() {
                debug!("no {} found, using defaults", DEFAULT_CONFIG_FILE);
                return Ok(Config::default());
            }
            candidate
        }
    };

    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let config = parse_config(&path, &content)?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    debug!(path = %path.display(), "loaded config");
    Ok(config.anchor(base))
}
