//! Engine configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (LEXCACHE_*)
//! 2. TOML config file (if LEXCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::eviction::EvictionPolicy;

mod validation;

pub use validation::ConfigError;

/// Engine configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (LEXCACHE_*)
/// 2. TOML config file (if LEXCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding the store file and export snapshots.
    ///
    /// Everything under it counts towards the cache size.
    /// Set via LEXCACHE_CACHE_DIR environment variable.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// File name of the SQLite store inside `cache_dir`.
    ///
    /// Set via LEXCACHE_DB_FILE environment variable.
    #[serde(default = "default_db_file")]
    pub db_file: String,

    /// Soft ceiling on the cache size in bytes.
    ///
    /// Set via LEXCACHE_MAX_CACHE_SIZE_BYTES environment variable.
    #[serde(default = "default_max_cache_size_bytes")]
    pub max_cache_size_bytes: u64,

    /// Conversations kept when eviction runs.
    ///
    /// Set via LEXCACHE_KEEP_COUNT environment variable.
    #[serde(default = "default_keep_count")]
    pub keep_count: usize,

    /// Conversations returned by cached-data reads and exports.
    ///
    /// Set via LEXCACHE_RECENT_LIMIT environment variable.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,

    /// TTL in seconds for generic cache entries written without one.
    ///
    /// Set via LEXCACHE_CACHE_TTL_SECS environment variable.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Optional JSON file replacing the compiled-in knowledge base.
    ///
    /// Set via LEXCACHE_KNOWLEDGE_BASE_PATH environment variable.
    #[serde(default)]
    pub knowledge_base_path: Option<PathBuf>,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache")
}

fn default_db_file() -> String {
    "offline_data.db".into()
}

fn default_max_cache_size_bytes() -> u64 {
    50 * 1024 * 1024 // 50MB
}

fn default_keep_count() -> usize {
    100
}

fn default_recent_limit() -> usize {
    50
}

fn default_cache_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            db_file: default_db_file(),
            max_cache_size_bytes: default_max_cache_size_bytes(),
            keep_count: default_keep_count(),
            recent_limit: default_recent_limit(),
            cache_ttl_secs: default_cache_ttl_secs(),
            knowledge_base_path: None,
        }
    }
}

impl EngineConfig {
    /// Full path of the SQLite store file.
    pub fn db_path(&self) -> PathBuf {
        self.cache_dir.join(&self.db_file)
    }

    /// Default TTL for generic cache entries.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Eviction policy derived from the size ceiling and keep count.
    pub fn eviction_policy(&self) -> EvictionPolicy {
        EvictionPolicy { max_cache_size: self.max_cache_size_bytes, keep_count: self.keep_count }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `LEXCACHE_`
    /// 2. TOML file from `LEXCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("LEXCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("LEXCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
