//! The offline cache service.
//!
//! `OfflineEngine` owns the store handle and the knowledge base for the
//! lifetime of the process and exposes the operations the chat backend
//! calls: caching turns, reading the cached state, answering queries
//! offline, syncing, backup and statistics. Each operation runs to
//! completion before returning; callers that need a deadline wrap the
//! future themselves.

use crate::backup::{self, ExportSnapshot};
use crate::config::EngineConfig;
use crate::knowledge::KnowledgeBase;
use crate::resolver::{Resolution, Resolver};
use crate::store::{CacheEntry, ConversationRecord, NewConversation, Preferences, Store, UserType, timestamp};
use crate::sync::SyncOutcome;
use crate::Error;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// A read that degrades to a default value instead of failing.
///
/// `error` holds the failure that forced the default, if any.
#[derive(Debug)]
pub struct Fallback<T> {
    pub value: T,
    pub error: Option<Error>,
}

impl<T> Fallback<T> {
    fn ok(value: T) -> Self {
        Self { value, error: None }
    }

    fn degraded(value: T, error: Error) -> Self {
        Self { value, error: Some(error) }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    /// The value, or the error that degraded it.
    pub fn into_result(self) -> Result<T, Error> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.value),
        }
    }
}

/// Result of caching conversation turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CacheOutcome {
    pub cached_count: usize,
    pub cache_size_bytes: u64,
}

/// Everything a client needs to keep working offline.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachedData {
    pub conversations: Vec<ConversationRecord>,
    pub preferences: Preferences,
    pub knowledge_base: KnowledgeBase,
    #[serde(with = "timestamp::fixed")]
    #[schemars(with = "String")]
    pub cache_timestamp: DateTime<Utc>,
}

/// Result of replaying a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImportOutcome {
    pub imported_conversations: usize,
    pub imported_preferences: usize,
    /// Whether the snapshot's digest was present and checked.
    pub verified: bool,
    pub cache_size_bytes: u64,
}

/// Offline usage counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OfflineStatistics {
    pub total_conversations: u64,
    pub offline_conversations: u64,
    pub unsynced_conversations: u64,
    /// Cache size in MiB, rounded to two decimals.
    pub cache_size_mb: f64,
    pub cache_size_bytes: u64,
    pub knowledge_base_terms: usize,
    pub knowledge_base_procedures: usize,
    pub emergency_contacts: usize,
}

/// Result of a manual purge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PurgeOutcome {
    pub conversations_deleted: u64,
    pub entries_deleted: u64,
    pub cache_size_bytes: u64,
}

/// Long-lived offline cache service.
#[derive(Debug, Clone)]
pub struct OfflineEngine {
    store: Store,
    resolver: Resolver,
    config: Arc<EngineConfig>,
}

impl OfflineEngine {
    /// Open the engine described by `config`.
    ///
    /// Creates the cache directory, loads the knowledge base and opens (or
    /// creates) the store. Any failure here is fatal for the engine.
    pub async fn open(config: EngineConfig) -> Result<Self, Error> {
        std::fs::create_dir_all(&config.cache_dir)
            .map_err(|e| Error::Storage(format!("failed to create {}: {e}", config.cache_dir.display())))?;

        let kb = load_knowledge_base(&config)?;
        let store = Store::open(config.db_path())
            .await?
            .with_eviction(config.eviction_policy());

        tracing::info!(
            db_path = %config.db_path().display(),
            max_cache_size_bytes = config.max_cache_size_bytes,
            knowledge_base_terms = kb.term_count(),
            "offline engine opened"
        );

        Ok(Self { store, resolver: Resolver::new(Arc::new(kb)), config: Arc::new(config) })
    }

    /// Open an engine over an in-memory store.
    ///
    /// Exports still go to `config.cache_dir`.
    pub async fn open_in_memory(config: EngineConfig) -> Result<Self, Error> {
        let kb = load_knowledge_base(&config)?;
        let store = Store::open_in_memory()
            .await?
            .with_eviction(config.eviction_policy());
        Ok(Self { store, resolver: Resolver::new(Arc::new(kb)), config: Arc::new(config) })
    }

    /// Replace the knowledge base used for resolution and reads.
    pub fn with_knowledge_base(mut self, kb: KnowledgeBase) -> Self {
        self.resolver = Resolver::new(Arc::new(kb));
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        self.resolver.knowledge_base()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Append conversation turns and upsert preferences, then evict if the
    /// cache is over its ceiling.
    ///
    /// Nothing is rolled back if eviction fails after the write committed.
    pub async fn cache_conversation_data(
        &self, conversations: &[NewConversation], preferences: Option<&Preferences>,
    ) -> Result<CacheOutcome, Error> {
        let empty = Preferences::new();
        let outcome = self
            .store
            .put_conversations(conversations, preferences.unwrap_or(&empty))
            .await?;
        Ok(CacheOutcome { cached_count: outcome.written, cache_size_bytes: outcome.total_size_bytes })
    }

    /// Recent conversations, preferences and the knowledge base.
    ///
    /// On a store failure the conversations and preferences come back
    /// empty; the knowledge base is always present.
    pub async fn get_cached_data(&self) -> Fallback<CachedData> {
        let read = async {
            let conversations = self.store.get_recent(self.config.recent_limit).await?;
            let preferences = self.store.get_preferences().await?;
            Ok::<_, Error>((conversations, preferences))
        };

        match read.await {
            Ok((conversations, preferences)) => Fallback::ok(self.cached_data(conversations, preferences)),
            Err(e) => {
                tracing::warn!(error = %e, "cached data unavailable, serving knowledge base only");
                Fallback::degraded(self.cached_data(Vec::new(), Preferences::new()), e)
            }
        }
    }

    fn cached_data(&self, conversations: Vec<ConversationRecord>, preferences: Preferences) -> CachedData {
        CachedData {
            conversations,
            preferences,
            knowledge_base: self.knowledge_base().clone(),
            cache_timestamp: timestamp::now(),
        }
    }

    /// Answer a query from the knowledge base and record it for sync.
    pub async fn process_offline_query(&self, query: &str) -> Resolution {
        self.resolver.resolve(&self.store, query).await
    }

    /// Reconcile offline activity; see [`Store::sync`].
    pub async fn sync_offline_data(&self, offline_conversations: &[NewConversation]) -> Result<SyncOutcome, Error> {
        self.store.sync(offline_conversations).await
    }

    /// Write a snapshot of the cached state into the cache directory.
    ///
    /// # Errors
    ///
    /// `Serialization` if the store can't be read or the file can't be
    /// written.
    pub async fn export_offline_data(&self) -> Result<PathBuf, Error> {
        let data = self
            .get_cached_data()
            .await
            .into_result()
            .map_err(|e| Error::Serialization(format!("cached state unavailable: {e}")))?;

        let snapshot = ExportSnapshot {
            conversations: data.conversations,
            preferences: data.preferences,
            knowledge_base: data.knowledge_base,
            cache_timestamp: data.cache_timestamp,
            export_timestamp: timestamp::now(),
        };
        let path = backup::write_snapshot(&self.config.cache_dir, &snapshot)?;

        tracing::info!(
            path = %path.display(),
            conversations = snapshot.conversations.len(),
            "exported offline data"
        );
        Ok(path)
    }

    /// Replay a snapshot's conversations and preferences through the cache
    /// write path.
    ///
    /// Imported conversations are appended as new unsynced rows.
    pub async fn import_offline_data(&self, path: &Path) -> Result<ImportOutcome, Error> {
        let snapshot = backup::read_snapshot(path)?;
        let outcome = self
            .cache_conversation_data(&snapshot.conversations, Some(&snapshot.preferences))
            .await?;

        tracing::info!(
            path = %path.display(),
            conversations = outcome.cached_count,
            verified = snapshot.verified,
            "imported offline data"
        );
        Ok(ImportOutcome {
            imported_conversations: outcome.cached_count,
            imported_preferences: snapshot.preferences.len(),
            verified: snapshot.verified,
            cache_size_bytes: outcome.cache_size_bytes,
        })
    }

    /// Usage counters; zeros for the store-backed fields on failure.
    pub async fn get_offline_statistics(&self) -> Fallback<OfflineStatistics> {
        let kb = self.knowledge_base();
        let mut stats = OfflineStatistics {
            knowledge_base_terms: kb.term_count(),
            knowledge_base_procedures: kb.procedure_count(),
            emergency_contacts: kb.emergency_contact_count(),
            ..Default::default()
        };

        let read = async {
            let total = self.store.count_conversations().await?;
            let offline = self.store.count_by_user_type(UserType::Offline).await?;
            let unsynced = self.store.count_unsynced().await?;
            let size = self.store.size_bytes().await?;
            Ok::<_, Error>((total, offline, unsynced, size))
        };

        match read.await {
            Ok((total, offline, unsynced, size)) => {
                stats.total_conversations = total;
                stats.offline_conversations = offline;
                stats.unsynced_conversations = unsynced;
                stats.cache_size_bytes = size;
                stats.cache_size_mb = bytes_to_mb(size);
                Fallback::ok(stats)
            }
            Err(e) => {
                tracing::warn!(error = %e, "offline statistics unavailable");
                Fallback::degraded(stats, e)
            }
        }
    }

    /// Store a generic cache entry; `ttl` defaults to the configured TTL.
    pub async fn put_cached_value(&self, key: &str, value: &Value, ttl: Option<Duration>) -> Result<(), Error> {
        if key.is_empty() {
            return Err(Error::InvalidInput("key cannot be empty".into()));
        }
        let ttl = ttl.unwrap_or_else(|| self.config.cache_ttl());
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| Error::InvalidInput(format!("ttl out of range: {e}")))?;
        self.store.put_cache_entry(key, value, Some(ttl)).await
    }

    /// Read a live generic cache entry.
    pub async fn get_cached_value(&self, key: &str) -> Result<CacheEntry, Error> {
        self.store
            .get_cache_entry(key)
            .await?
            .ok_or_else(|| Error::CacheMiss(key.to_string()))
    }

    /// Purge regardless of the size ceiling.
    ///
    /// `keep_latest` trims conversations to that many; `expired` removes
    /// expired cache entries.
    pub async fn purge(&self, keep_latest: Option<usize>, expired: bool) -> Result<PurgeOutcome, Error> {
        if keep_latest.is_none() && !expired {
            return Err(Error::InvalidInput("At least one of keep_latest or expired must be specified".into()));
        }

        let mut outcome = PurgeOutcome::default();
        if let Some(keep) = keep_latest {
            outcome.conversations_deleted = self.store.trim_conversations(keep).await?;
        }
        if expired {
            outcome.entries_deleted = self.store.purge_expired_entries().await?;
        }
        outcome.cache_size_bytes = self.store.size_bytes().await?;
        Ok(outcome)
    }
}

fn load_knowledge_base(config: &EngineConfig) -> Result<KnowledgeBase, Error> {
    match &config.knowledge_base_path {
        Some(path) => KnowledgeBase::load(path),
        None => Ok(KnowledgeBase::builtin()),
    }
}

fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
}
