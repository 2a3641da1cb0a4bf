//! Configuration validation rules.
//!
//! This module provides validation logic for `EngineConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::EngineConfig;
use thiserror::Error;

/// Upper bound on conversations returned by a single cached-data read.
const MAX_RECENT_LIMIT: usize = 1000;

/// Upper bound on the default cache-entry TTL (100 years).
const MAX_CACHE_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl EngineConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_cache_size_bytes`, `keep_count` or `cache_ttl_secs` is 0
    /// - `recent_limit` is 0 or exceeds 1000
    /// - `cache_ttl_secs` exceeds 100 years
    /// - `db_file` is empty or contains a path separator
    ///
    /// Returns `ConfigError::Missing` if `cache_dir` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                field: "cache_dir".into(),
                hint: "Set LEXCACHE_CACHE_DIR environment variable".into(),
            });
        }

        if self.db_file.is_empty() {
            return Err(ConfigError::Invalid { field: "db_file".into(), reason: "must not be empty".into() });
        }
        if self.db_file.contains(['/', '\\']) {
            return Err(ConfigError::Invalid {
                field: "db_file".into(),
                reason: "must be a file name, not a path".into(),
            });
        }

        if self.max_cache_size_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_cache_size_bytes".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.keep_count == 0 {
            return Err(ConfigError::Invalid { field: "keep_count".into(), reason: "must be greater than 0".into() });
        }

        if self.recent_limit == 0 {
            return Err(ConfigError::Invalid { field: "recent_limit".into(), reason: "must be greater than 0".into() });
        }
        if self.recent_limit > MAX_RECENT_LIMIT {
            return Err(ConfigError::Invalid {
                field: "recent_limit".into(),
                reason: format!("must not exceed {MAX_RECENT_LIMIT}"),
            });
        }

        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "cache_ttl_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(ConfigError::Invalid {
                field: "cache_ttl_secs".into(),
                reason: format!("must not exceed {MAX_CACHE_TTL_SECS}"),
            });
        }

        if self.recent_limit > self.keep_count {
            tracing::warn!(
                recent_limit = self.recent_limit,
                keep_count = self.keep_count,
                "recent_limit exceeds keep_count; reads after eviction return at most keep_count conversations"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_cache_dir() {
        let config = EngineConfig { cache_dir: PathBuf::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field == "cache_dir"));
    }

    #[test]
    fn test_validate_db_file_with_separator() {
        let config = EngineConfig { db_file: "nested/offline.db".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "db_file"));
    }

    #[test]
    fn test_validate_zero_ceiling() {
        let config = EngineConfig { max_cache_size_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_cache_size_bytes"));
    }

    #[test]
    fn test_validate_zero_keep_count() {
        let config = EngineConfig { keep_count: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "keep_count"));
    }

    #[test]
    fn test_validate_recent_limit_bounds() {
        let config = EngineConfig { recent_limit: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "recent_limit"));

        let config = EngineConfig { recent_limit: 1001, keep_count: 2000, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "recent_limit"));

        let config = EngineConfig { recent_limit: 1000, keep_count: 1000, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_recent_limit_above_keep_count_is_allowed() {
        let config = EngineConfig { recent_limit: 50, keep_count: 10, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_ttl() {
        let config = EngineConfig { cache_ttl_secs: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_ttl_secs"));
    }

    #[test]
    fn test_validate_ttl_exceeds_limit() {
        let config = EngineConfig { cache_ttl_secs: 10_000_000_000_000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_ttl_secs"));

        let config = EngineConfig { cache_ttl_secs: MAX_CACHE_TTL_SECS, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
