//! Content digest for export snapshots.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Compute the snapshot digest over its conversations and preferences.
///
/// Both parts are hashed in their compact `serde_json` form, so a parsed
/// and re-encoded snapshot hashes the same as the one written.
pub fn compute_snapshot_digest(conversations: &Value, preferences: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(conversations.to_string().as_bytes());
    hasher.update(b"\n");
    hasher.update(preferences.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_digest_stability() {
        let conversations = json!([{"query": "q", "response": "r"}]);
        let preferences = json!({"language": "kn"});
        assert_eq!(
            compute_snapshot_digest(&conversations, &preferences),
            compute_snapshot_digest(&conversations, &preferences)
        );
    }

    #[test]
    fn test_digest_detects_changes() {
        let prefs = json!({});
        let before = compute_snapshot_digest(&json!([{"query": "q"}]), &prefs);
        let after = compute_snapshot_digest(&json!([{"query": "q2"}]), &prefs);
        assert_ne!(before, after);
    }

    #[test]
    fn test_digest_format() {
        let digest = compute_snapshot_digest(&json!([]), &json!({}));
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
