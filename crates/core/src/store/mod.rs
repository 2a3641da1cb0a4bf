//! SQLite-backed persistent store for the offline cache.
//!
//! This module provides a single-file store using SQLite with async access
//! via tokio-rusqlite. It holds three record families:
//!
//! - Conversation records (append-only, flipped to synced in bulk)
//! - Generic cache entries with optional expiry
//! - User preferences (upserted, never expired)
//!
//! Schema creation is migration-based and safe to run repeatedly.

pub mod connection;
pub mod conversations;
pub mod entries;
pub mod migrations;
pub mod preferences;
pub mod timestamp;

pub use crate::Error;

pub use connection::Store;
pub use conversations::{ConversationRecord, NewConversation, PutOutcome, UserType};
pub use entries::CacheEntry;
pub use preferences::Preferences;
