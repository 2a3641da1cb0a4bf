//! Size-bounded eviction.
//!
//! When the measured cache size exceeds the ceiling, conversations are
//! trimmed to the most recent `keep_count` and expired cache entries are
//! purged. The size is not re-checked afterwards: if preferences, live
//! entries or export snapshots dominate, the cache can stay above the
//! ceiling. The ceiling is advisory.
//!
//! A pass measures, deletes and re-measures inside a single call on the
//! store's connection thread, so passes never interleave with each other
//! or with other store operations.

use crate::Error;
use crate::store::conversations::delete_all_but_recent;
use crate::store::entries::delete_expired;
use crate::store::Store;
use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Size ceiling and retention applied after conversation writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvictionPolicy {
    /// Soft ceiling on the persisted size in bytes.
    pub max_cache_size: u64,
    /// Conversations kept when the ceiling is exceeded.
    pub keep_count: usize,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self { max_cache_size: 50 * 1024 * 1024, keep_count: 100 }
    }
}

/// What a single eviction pass did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EvictionReport {
    /// Whether the ceiling was exceeded and the purge ran.
    pub triggered: bool,
    /// Measured size before the pass.
    pub size_before: u64,
    /// Measured size after the pass; equal to `size_before` when nothing ran.
    pub size_after: u64,
    pub conversations_deleted: u64,
    pub entries_deleted: u64,
}

impl EvictionPolicy {
    /// Whether a measured size is over the ceiling.
    pub fn exceeded(&self, size_bytes: u64) -> bool {
        size_bytes > self.max_cache_size
    }

    /// Run the two-phase purge if the store is over the ceiling.
    pub async fn enforce(&self, store: &Store) -> Result<EvictionReport, Error> {
        let policy = self.clone();
        let location = store.location().clone();
        let report = store
            .conn
            .call(move |conn| -> Result<EvictionReport, Error> {
                let size_before = location.measure(conn)?;
                if !policy.exceeded(size_before) {
                    return Ok(EvictionReport { size_before, size_after: size_before, ..Default::default() });
                }

                let tx = conn.transaction()?;
                let conversations_deleted = delete_all_but_recent(&tx, policy.keep_count)?;
                let entries_deleted = delete_expired(&tx, &Utc::now())?;
                tx.commit()?;

                let size_after = location.measure(conn)?;
                Ok(EvictionReport { triggered: true, size_before, size_after, conversations_deleted, entries_deleted })
            })
            .await
            .map_err(Error::from)?;

        if report.triggered {
            tracing::info!(
                size_before = report.size_before,
                size_after = report.size_after,
                max_cache_size = self.max_cache_size,
                conversations_deleted = report.conversations_deleted,
                entries_deleted = report.entries_deleted,
                "cache over ceiling, evicted"
            );
            if self.exceeded(report.size_after) {
                tracing::debug!(size_after = report.size_after, "cache still over ceiling after eviction");
            }
        }

        Ok(report)
    }
}
