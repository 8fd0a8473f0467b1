//! Database and cache configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::binary::DEFAULT_MAX_REDIRECT_DEPTH;
use crate::error::{Error, Result};

/// Default cache capacity (number of entries).
const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// How the database file is accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Memory-map the file
    #[default]
    Mmap,
    /// Positioned reads on an open file handle
    File,
    /// Read the whole file into memory
    Memory,
}

impl SourceMode {
    /// Parse a mode name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mmap" => Some(SourceMode::Mmap),
            "file" | "pread" => Some(SourceMode::File),
            "memory" | "mem" => Some(SourceMode::Memory),
            _ => None,
        }
    }
}

/// Options for opening a database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// File access mode
    pub source: SourceMode,
    /// Copy the index region into memory at open time
    pub preload_index: bool,
    /// Maximum redirects followed while decoding one field
    pub max_redirect_depth: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            source: SourceMode::Mmap,
            preload_index: true,
            max_redirect_depth: DEFAULT_MAX_REDIRECT_DEPTH,
        }
    }
}

impl DatabaseConfig {
    /// Load a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot resolve any record.
    pub fn validate(&self) -> Result<()> {
        if self.max_redirect_depth == 0 {
            return Err(Error::Config(
                "max_redirect_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the cached database.
#[derive(Debug, Clone)]
pub struct CachedDatabaseConfig {
    /// Maximum number of entries in the cache.
    pub cache_capacity: usize,
    /// Whether to enable caching.
    pub cache_enabled: bool,
}

impl Default for CachedDatabaseConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_enabled: true,
        }
    }
}

impl CachedDatabaseConfig {
    /// Create a new configuration with the specified cache capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache_capacity: capacity,
            cache_enabled: true,
        }
    }

    /// Create a configuration with caching disabled.
    pub fn no_cache() -> Self {
        Self {
            cache_capacity: 0,
            cache_enabled: false,
        }
    }
}
