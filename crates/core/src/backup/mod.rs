//! Portable snapshots of the cached state.
//!
//! An export is a pretty-printed JSON document holding the recent
//! conversations, the preferences, the knowledge base and a SHA-256 digest
//! over the conversations and preferences. Import reads the conversations
//! and preferences back; the knowledge base in a snapshot is informational
//! and never replaces the running one.

pub mod digest;

use crate::Error;
use crate::knowledge::KnowledgeBase;
use crate::store::{ConversationRecord, NewConversation, Preferences, timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

pub use digest::compute_snapshot_digest;

/// File name prefix shared by every export snapshot.
pub const SNAPSHOT_PREFIX: &str = "offline_backup_";

/// The document written by an export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSnapshot {
    pub conversations: Vec<ConversationRecord>,
    pub preferences: Preferences,
    pub knowledge_base: KnowledgeBase,
    #[serde(with = "timestamp::fixed")]
    pub cache_timestamp: DateTime<Utc>,
    #[serde(with = "timestamp::fixed")]
    pub export_timestamp: DateTime<Utc>,
}

/// The parts of a snapshot that an import replays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedSnapshot {
    pub conversations: Vec<NewConversation>,
    pub preferences: Preferences,
    /// Whether the snapshot carried a digest that was checked.
    pub verified: bool,
}

/// Snapshot file name for an export taken at `at`.
pub fn snapshot_file_name(at: &DateTime<Utc>) -> String {
    format!("{SNAPSHOT_PREFIX}{}.json", at.format("%Y%m%d_%H%M%S_%3f"))
}

/// Write a snapshot into `dir` and return its path.
///
/// Never overwrites an existing file; a name collision gets a numeric
/// suffix.
pub fn write_snapshot(dir: &Path, snapshot: &ExportSnapshot) -> Result<PathBuf, Error> {
    let mut document = serde_json::to_value(snapshot).map_err(|e| Error::Serialization(e.to_string()))?;
    let digest = compute_snapshot_digest(&document["conversations"], &document["preferences"]);
    if let Value::Object(map) = &mut document {
        map.insert("digest".into(), Value::String(digest));
    }
    let body = serde_json::to_string_pretty(&document).map_err(|e| Error::Serialization(e.to_string()))?;

    std::fs::create_dir_all(dir)
        .map_err(|e| Error::Serialization(format!("failed to create {}: {e}", dir.display())))?;

    let base = snapshot_file_name(&snapshot.export_timestamp);
    let stem = base.trim_end_matches(".json");
    for attempt in 0..100 {
        let name = match attempt {
            0 => base.clone(),
            n => format!("{stem}_{n}.json"),
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(body.as_bytes())
                    .and_then(|_| file.sync_all())
                    .map_err(|e| Error::Serialization(format!("failed to write {}: {e}", path.display())))?;
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(Error::Serialization(format!("failed to create {}: {e}", path.display()))),
        }
    }

    Err(Error::Serialization(format!("no free snapshot name for {base} in {}", dir.display())))
}

/// Read the replayable parts of a snapshot.
///
/// A missing `conversations` or `preferences` field reads as empty. When a
/// `digest` is present it must match the content.
///
/// # Errors
///
/// `NotFound` if `path` doesn't exist, `Format` if the content isn't a
/// snapshot document or fails its digest check.
pub fn read_snapshot(path: &Path) -> Result<ImportedSnapshot, Error> {
    let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
        _ => Error::Format(format!("failed to read {}: {e}", path.display())),
    })?;

    let document: Value = serde_json::from_str(&raw).map_err(|e| Error::Format(format!("{}: {e}", path.display())))?;
    let Value::Object(mut fields) = document else {
        return Err(Error::Format(format!("{}: snapshot must be a JSON object", path.display())));
    };

    let conversations = fields.remove("conversations").unwrap_or_else(|| Value::Array(Vec::new()));
    let preferences = fields.remove("preferences").unwrap_or_else(|| Value::Object(Default::default()));

    let verified = match fields.get("digest") {
        Some(Value::String(expected)) => {
            let actual = compute_snapshot_digest(&conversations, &preferences);
            if &actual != expected {
                return Err(Error::Format(format!("{}: digest mismatch", path.display())));
            }
            true
        }
        Some(Value::Null) | None => false,
        Some(_) => return Err(Error::Format(format!("{}: digest must be a string", path.display()))),
    };

    let conversations: Vec<NewConversation> = serde_json::from_value(conversations)
        .map_err(|e| Error::Format(format!("{}: conversations: {e}", path.display())))?;
    let preferences: Preferences = serde_json::from_value(preferences)
        .map_err(|e| Error::Format(format!("{}: preferences: {e}", path.display())))?;

    Ok(ImportedSnapshot { conversations, preferences, verified })
}
