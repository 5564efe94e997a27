//! Database configuration via `nodex.toml`
//!
//! On first open, a default `nodex.toml` is created in the data directory.
//! It lists the index modules to load, in order; to change them, edit the
//! file and reopen the database.

use crate::indexing::IndexKind;
use nodex_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Config file name placed in the database data directory.
pub const CONFIG_FILE_NAME: &str = "nodex.toml";

fn default_lock_timeout_ms() -> u64 {
    5000
}

/// One `[[index]]` entry: an index module and its engine options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexModuleConfig {
    /// Engine kind: `"fulltext"` or `"rdf"`
    pub kind: IndexKind,
    /// Display name; defaults to the kind's id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Engine-specific options, e.g. `file_mode = "mapped"`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

impl IndexModuleConfig {
    /// Module entry with no options
    pub fn new(kind: IndexKind) -> Self {
        IndexModuleConfig {
            kind,
            name: None,
            options: BTreeMap::new(),
        }
    }

    /// Set an engine option
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Configured name, or the kind's id
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.kind.id())
    }

    /// Engine option by key
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Boolean engine option; `"true"`, `"yes"` and `"1"` are true
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.option(key), Some("true" | "yes" | "1"))
    }
}

/// Database configuration loaded from `nodex.toml`.
///
/// # Example
///
/// ```toml
/// lock_timeout_ms = 5000
///
/// [[index]]
/// kind = "fulltext"
///
/// [[index]]
/// kind = "rdf"
/// [index.options]
/// file_mode = "mapped"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// How long a document lock acquisition waits before giving up
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// Index modules, opened in this order
    #[serde(default, rename = "index")]
    pub indexes: Vec<IndexModuleConfig>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            indexes: vec![
                IndexModuleConfig::new(IndexKind::FullText),
                IndexModuleConfig::new(IndexKind::Rdf).with_option("file_mode", "mapped"),
            ],
        }
    }
}

impl DatabaseConfig {
    /// Lock timeout as a `Duration`
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Reject duplicate index kinds.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if two `[[index]]` entries share a kind.
    pub fn validate(&self) -> Result<()> {
        for (i, module) in self.indexes.iter().enumerate() {
            if self.indexes[..i].iter().any(|m| m.kind == module.kind) {
                return Err(Error::config(format!(
                    "index kind '{}' is configured more than once in {}",
                    module.kind, CONFIG_FILE_NAME
                )));
            }
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# nodex database configuration
#
# How long (ms) a document lock acquisition waits before failing
lock_timeout_ms = 5000

# Index modules, opened in the order listed.
[[index]]
kind = "fulltext"

[[index]]
kind = "rdf"
[index.options]
# "mapped" or "direct"
file_mode = "mapped"
# log each SPARQL query at debug level
# log_exec = "true"
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: DatabaseConfig = toml::from_str(&content).map_err(|e| {
            Error::config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
