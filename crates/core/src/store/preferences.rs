//! User preference operations.
//!
//! Preferences are arbitrary JSON values keyed by name, upserted on write
//! and never expired.

use super::connection::Store;
use super::timestamp;
use crate::Error;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::Transaction;

/// Preference values keyed by preference name.
pub type Preferences = BTreeMap<String, Value>;

/// Upsert every preference inside an open transaction.
pub(crate) fn upsert_preferences(
    tx: &Transaction<'_>, preferences: &Preferences, now: &DateTime<Utc>,
) -> Result<(), Error> {
    if preferences.is_empty() {
        return Ok(());
    }

    let updated_at = timestamp::encode(now);
    let mut stmt = tx.prepare(
        "INSERT INTO user_preferences (preference_key, preference_value, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(preference_key) DO UPDATE SET
            preference_value = excluded.preference_value,
            updated_at = excluded.updated_at",
    )?;
    for (key, value) in preferences {
        let encoded = serde_json::to_string(value)
            .map_err(|e| Error::Serialization(format!("preference {key}: {e}")))?;
        stmt.execute(params![key, encoded, updated_at])?;
    }
    Ok(())
}

impl Store {
    /// Upsert preferences without touching conversations.
    pub async fn put_preferences(&self, preferences: &Preferences) -> Result<(), Error> {
        let preferences = preferences.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let now = timestamp::now();
                let tx = conn.transaction()?;
                upsert_preferences(&tx, &preferences, &now)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// All stored preferences.
    ///
    /// A stored value that is no longer valid JSON is a `Format` error.
    pub async fn get_preferences(&self) -> Result<Preferences, Error> {
        self.conn
            .call(|conn| -> Result<Preferences, Error> {
                let mut stmt = conn.prepare("SELECT preference_key, preference_value FROM user_preferences")?;
                let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

                let mut preferences = Preferences::new();
                for row in rows {
                    let (key, raw) = row?;
                    let value = serde_json::from_str(&raw)
                        .map_err(|e| Error::Format(format!("stored preference {key}: {e}")))?;
                    preferences.insert(key, value);
                }
                Ok(preferences)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_and_get_preferences() {
        let store = Store::open_in_memory().await.unwrap();
        let mut prefs = Preferences::new();
        prefs.insert("language".into(), json!("kn"));
        prefs.insert("voice".into(), json!({"enabled": true, "rate": 1.25}));

        store.put_preferences(&prefs).await.unwrap();

        assert_eq!(store.get_preferences().await.unwrap(), prefs);
    }

    #[tokio::test]
    async fn test_upsert_last_write_wins() {
        let store = Store::open_in_memory().await.unwrap();
        store
            .put_preferences(&Preferences::from([("language".to_string(), json!("en"))]))
            .await
            .unwrap();
        store
            .put_preferences(&Preferences::from([("language".to_string(), json!("kn"))]))
            .await
            .unwrap();

        let prefs = store.get_preferences().await.unwrap();
        assert_eq!(prefs.len(), 1);
        assert_eq!(prefs["language"], json!("kn"));
    }

    #[tokio::test]
    async fn test_preferences_ride_along_with_conversations() {
        let store = Store::open_in_memory().await.unwrap();
        let prefs = Preferences::from([("theme".to_string(), json!("dark"))]);

        store.put_conversations(&[], &prefs).await.unwrap();

        assert_eq!(store.get_preferences().await.unwrap(), prefs);
    }

    #[tokio::test]
    async fn test_empty_store_has_no_preferences() {
        let store = Store::open_in_memory().await.unwrap();
        assert!(store.get_preferences().await.unwrap().is_empty());
    }
}
