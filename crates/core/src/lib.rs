//! Core of the offline legal-assistant cache.
//!
//! This crate provides:
//! - A SQLite-backed store for conversations, cache entries and preferences
//! - Size-based eviction
//! - An offline resolver over a bundled Kannada legal knowledge base
//! - Sync bookkeeping and JSON snapshot export/import
//! - Layered configuration and unified error types

pub mod backup;
pub mod config;
pub mod engine;
pub mod error;
pub mod eviction;
pub mod knowledge;
pub mod resolver;
pub mod store;
pub mod sync;

pub use config::{ConfigError, EngineConfig};
pub use engine::{CacheOutcome, CachedData, Fallback, ImportOutcome, OfflineEngine, OfflineStatistics, PurgeOutcome};
pub use error::Error;
pub use eviction::{EvictionPolicy, EvictionReport};
pub use knowledge::KnowledgeBase;
pub use resolver::{Resolution, Resolver, Source};
pub use store::{CacheEntry, ConversationRecord, NewConversation, Preferences, Store, UserType};
pub use sync::SyncOutcome;
