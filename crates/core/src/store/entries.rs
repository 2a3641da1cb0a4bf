//! Generic cache entry operations.
//!
//! Key/value entries with an optional expiry. Writes replace any entry with
//! the same key; expired entries read as missing and are removed by
//! eviction.

use super::connection::Store;
use super::timestamp;
use crate::Error;
use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A live generic cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CacheEntry {
    pub key: String,
    pub value: Value,
    #[serde(with = "timestamp::fixed")]
    #[schemars(with = "String")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, with = "timestamp::lenient", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Delete entries whose expiry is before `now`.
pub(crate) fn delete_expired(conn: &rusqlite::Connection, now: &DateTime<Utc>) -> rusqlite::Result<u64> {
    let count = conn.execute(
        "DELETE FROM cache_entries WHERE expires_at IS NOT NULL AND expires_at < ?1",
        params![timestamp::encode(now)],
    )?;
    Ok(count as u64)
}

impl Store {
    /// Insert or replace a cache entry.
    ///
    /// `ttl` of `None` stores an entry that never expires. A zero or
    /// negative TTL stores an entry that is already an eviction candidate.
    pub async fn put_cache_entry(&self, key: &str, value: &Value, ttl: Option<Duration>) -> Result<(), Error> {
        let key = key.to_string();
        let encoded = serde_json::to_string(value).map_err(|e| Error::Serialization(format!("entry {key}: {e}")))?;
        let now = timestamp::now();
        let expires_at = match ttl {
            Some(ttl) => {
                let at = timestamp::checked_add(&now, ttl)
                    .ok_or_else(|| Error::InvalidInput(format!("ttl for {key} is out of range")))?;
                Some(timestamp::encode(&at))
            }
            None => None,
        };
        let written_at = timestamp::encode(&now);

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_entries (key, value, timestamp, expires_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        timestamp = excluded.timestamp,
                        expires_at = excluded.expires_at",
                    params![key, encoded, written_at, expires_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get a live cache entry by key.
    ///
    /// Returns None if the key doesn't exist or the entry has expired.
    pub async fn get_cache_entry(&self, key: &str) -> Result<Option<CacheEntry>, Error> {
        let key = key.to_string();
        let now = timestamp::encode(&Utc::now());
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let result = conn.query_row(
                    "SELECT key, value, timestamp, expires_at FROM cache_entries
                     WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
                    params![key, now],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, Option<String>>(3)?,
                        ))
                    },
                );

                let (key, raw_value, raw_ts, raw_expires) = match result {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let value = serde_json::from_str(&raw_value)
                    .map_err(|e| Error::Format(format!("stored entry {key}: {e}")))?;
                let timestamp = timestamp::parse(&raw_ts)
                    .ok_or_else(|| Error::Format(format!("stored entry {key}: invalid timestamp {raw_ts}")))?;
                let expires_at = raw_expires.as_deref().and_then(timestamp::parse);

                Ok(Some(CacheEntry { key, value, timestamp, expires_at }))
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries whose expiry has passed.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_expired_entries(&self) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> { Ok(delete_expired(conn, &Utc::now())?) })
            .await
            .map_err(Error::from)
    }

    /// Number of stored entries, expired or not.
    pub async fn count_cache_entries(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
