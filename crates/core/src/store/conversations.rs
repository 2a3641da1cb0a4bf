//! Conversation record operations.
//!
//! Conversations are append-only: every write inserts a new row with a
//! store-assigned id. The only in-place change is the `is_synced` flip
//! performed by the synchronizer.

use super::connection::Store;
use super::preferences::{Preferences, upsert_preferences};
use super::timestamp;
use crate::Error;
use crate::eviction::EvictionReport;
use chrono::{DateTime, SubsecRound, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Type, ValueRef};
use tokio_rusqlite::rusqlite::{self, Row, ToSql, Transaction};

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    /// A turn answered online and cached by the chat backend.
    #[default]
    User,
    /// A turn answered by the offline resolver.
    Offline,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::User => "user",
            UserType::Offline => "offline",
        }
    }
}

impl ToSql for UserType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for UserType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "user" => Ok(UserType::User),
            "offline" => Ok(UserType::Offline),
            other => Err(FromSqlError::Other(format!("unknown user_type: {other}").into())),
        }
    }
}

/// A conversation turn as supplied by a caller, before the store assigns an id.
///
/// Missing `user_type` and `timestamp` are filled in by the operation that
/// writes the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NewConversation {
    pub query: String,
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<UserType>,
    #[serde(default, with = "timestamp::lenient", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewConversation {
    pub fn new(query: impl Into<String>, response: impl Into<String>) -> Self {
        Self { query: query.into(), response: response.into(), user_type: None, timestamp: None }
    }

    pub fn with_user_type(mut self, user_type: UserType) -> Self {
        self.user_type = Some(user_type);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// A stored conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConversationRecord {
    pub id: i64,
    pub query: String,
    pub response: String,
    pub user_type: UserType,
    #[serde(with = "timestamp::fixed")]
    #[schemars(with = "String")]
    pub timestamp: DateTime<Utc>,
    pub is_synced: bool,
}

impl From<ConversationRecord> for NewConversation {
    fn from(record: ConversationRecord) -> Self {
        Self {
            query: record.query,
            response: record.response,
            user_type: Some(record.user_type),
            timestamp: Some(record.timestamp),
        }
    }
}

/// Result of a bulk conversation write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PutOutcome {
    /// Conversation rows appended.
    pub written: usize,
    /// Persisted size after eviction ran.
    pub total_size_bytes: u64,
    /// What the eviction pass did.
    pub eviction: EvictionReport,
}

/// Append one conversation inside an open transaction.
///
/// Returns the new row id. A caller timestamp outside years 0000-9999 is
/// rejected, since it cannot be stored in fixed-width form.
pub(crate) fn insert_conversation(
    tx: &Transaction<'_>, record: &NewConversation, default_type: UserType, synced: bool, now: &DateTime<Utc>,
) -> Result<i64, Error> {
    let ts = record.timestamp.as_ref().unwrap_or(now);
    if !timestamp::storable(ts) {
        return Err(Error::InvalidInput(format!("timestamp out of range: {ts}")));
    }
    tx.execute(
        "INSERT INTO conversations (query, response, user_type, timestamp, is_synced)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            &record.query,
            &record.response,
            record.user_type.unwrap_or(default_type),
            timestamp::encode(ts),
            synced as i32,
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

/// Delete every conversation except the `keep` most recent.
pub(crate) fn delete_all_but_recent(conn: &rusqlite::Connection, keep: usize) -> rusqlite::Result<u64> {
    let keep = keep.min(i64::MAX as usize) as i64;
    let deleted = conn.execute(
        "DELETE FROM conversations WHERE id NOT IN (
            SELECT id FROM conversations ORDER BY timestamp DESC, id DESC LIMIT ?1
        )",
        params![keep],
    )?;
    Ok(deleted as u64)
}

fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationRecord> {
    let raw_ts: String = row.get(4)?;
    let ts = timestamp::parse(&raw_ts).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(4, Type::Text, format!("invalid timestamp: {raw_ts}").into())
    })?;

    Ok(ConversationRecord {
        id: row.get(0)?,
        query: row.get(1)?,
        response: row.get(2)?,
        user_type: row.get(3)?,
        timestamp: ts,
        is_synced: row.get::<_, i32>(5)? != 0,
    })
}

impl Store {
    /// Append conversation records and upsert preferences, then enforce the
    /// eviction policy.
    ///
    /// Records are never merged with existing rows; submitting the same
    /// record twice stores it twice. Records without a `user_type` are
    /// stored as [`UserType::User`], without a timestamp as now. The write
    /// commits before eviction runs, so an eviction failure leaves the
    /// written rows in place.
    pub async fn put_conversations(
        &self, records: &[NewConversation], preferences: &Preferences,
    ) -> Result<PutOutcome, Error> {
        let records = records.to_vec();
        let preferences = preferences.clone();
        let written = self
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let now = timestamp::now();
                let tx = conn.transaction()?;
                for record in &records {
                    insert_conversation(&tx, record, UserType::User, false, &now)?;
                }
                upsert_preferences(&tx, &preferences, &now)?;
                tx.commit()?;
                Ok(records.len())
            })
            .await
            .map_err(Error::from)?;

        tracing::debug!(written, "cached conversation records");

        let eviction = self.eviction().enforce(self).await?;

        Ok(PutOutcome { written, total_size_bytes: eviction.size_after, eviction })
    }

    /// Append a single conversation without running eviction.
    ///
    /// Returns the stored record.
    pub async fn append_conversation(
        &self, record: &NewConversation, default_type: UserType, synced: bool,
    ) -> Result<ConversationRecord, Error> {
        let record = record.clone();
        self.conn
            .call(move |conn| -> Result<ConversationRecord, Error> {
                let now = timestamp::now();
                let tx = conn.transaction()?;
                let id = insert_conversation(&tx, &record, default_type, synced, &now)?;
                tx.commit()?;
                Ok(ConversationRecord {
                    id,
                    query: record.query,
                    response: record.response,
                    user_type: record.user_type.unwrap_or(default_type),
                    timestamp: record.timestamp.unwrap_or(now).trunc_subsecs(6),
                    is_synced: synced,
                })
            })
            .await
            .map_err(Error::from)
    }

    /// Most recent conversations, newest first.
    ///
    /// Ties on timestamp are broken by insertion order, later first.
    pub async fn get_recent(&self, limit: usize) -> Result<Vec<ConversationRecord>, Error> {
        let limit = limit.min(i64::MAX as usize) as i64;
        self.conn
            .call(move |conn| -> Result<Vec<ConversationRecord>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, query, response, user_type, timestamp, is_synced
                     FROM conversations
                     ORDER BY timestamp DESC, id DESC
                     LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit], conversation_from_row)?;
                let records = rows.collect::<Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await
            .map_err(Error::from)
    }

    /// Total number of stored conversations.
    pub async fn count_conversations(&self) -> Result<u64, Error> {
        self.count("SELECT COUNT(*) FROM conversations", None).await
    }

    /// Number of conversations produced by the given kind of user.
    pub async fn count_by_user_type(&self, user_type: UserType) -> Result<u64, Error> {
        self.count("SELECT COUNT(*) FROM conversations WHERE user_type = ?1", Some(user_type))
            .await
    }

    /// Number of conversations not yet reconciled by the synchronizer.
    pub async fn count_unsynced(&self) -> Result<u64, Error> {
        self.count("SELECT COUNT(*) FROM conversations WHERE is_synced = 0", None)
            .await
    }

    async fn count(&self, sql: &'static str, user_type: Option<UserType>) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = match user_type {
                    Some(user_type) => conn.query_row(sql, params![user_type], |row| row.get(0))?,
                    None => conn.query_row(sql, [], |row| row.get(0))?,
                };
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every conversation except the `keep` most recent.
    ///
    /// Returns the number of deleted rows.
    pub async fn trim_conversations(&self, keep: usize) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> { Ok(delete_all_but_recent(conn, keep)?) })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eviction::EvictionPolicy;
    use chrono::{Duration, TimeZone};

    fn turn(n: usize) -> NewConversation {
        NewConversation::new(format!("query {n}"), format!("response {n}"))
    }

    #[tokio::test]
    async fn test_put_and_get_recent() {
        let store = Store::open_in_memory().await.unwrap();
        let outcome = store
            .put_conversations(&[turn(1), turn(2)], &Preferences::new())
            .await
            .unwrap();

        assert_eq!(outcome.written, 2);
        assert!(outcome.total_size_bytes > 0);
        assert!(!outcome.eviction.triggered);

        let recent = store.get_recent(50).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].query, "query 2");
        assert_eq!(recent[0].user_type, UserType::User);
        assert!(!recent[0].is_synced);
    }

    #[tokio::test]
    async fn test_recent_ordered_by_timestamp_not_insertion() {
        let store = Store::open_in_memory().await.unwrap();
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let records = vec![
            turn(1).at(base + Duration::minutes(5)),
            turn(2).at(base),
            turn(3).at(base + Duration::minutes(10)),
        ];
        store.put_conversations(&records, &Preferences::new()).await.unwrap();

        let queries: Vec<_> = store
            .get_recent(10)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.query)
            .collect();
        assert_eq!(queries, vec!["query 3", "query 1", "query 2"]);
    }

    #[tokio::test]
    async fn test_recent_ties_broken_by_insertion_order() {
        let store = Store::open_in_memory().await.unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        store
            .put_conversations(&[turn(1).at(ts), turn(2).at(ts)], &Preferences::new())
            .await
            .unwrap();

        let recent = store.get_recent(1).await.unwrap();
        assert_eq!(recent[0].query, "query 2");
    }

    #[tokio::test]
    async fn test_duplicates_are_appended() {
        let store = Store::open_in_memory().await.unwrap();
        store.put_conversations(&[turn(1)], &Preferences::new()).await.unwrap();
        store.put_conversations(&[turn(1)], &Preferences::new()).await.unwrap();

        assert_eq!(store.count_conversations().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_counts() {
        let store = Store::open_in_memory().await.unwrap();
        store
            .put_conversations(&[turn(1), turn(2).with_user_type(UserType::Offline)], &Preferences::new())
            .await
            .unwrap();
        store
            .append_conversation(&turn(3), UserType::Offline, true)
            .await
            .unwrap();

        assert_eq!(store.count_conversations().await.unwrap(), 3);
        assert_eq!(store.count_by_user_type(UserType::Offline).await.unwrap(), 2);
        assert_eq!(store.count_by_user_type(UserType::User).await.unwrap(), 1);
        assert_eq!(store.count_unsynced().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_append_returns_stored_record() {
        let store = Store::open_in_memory().await.unwrap();
        let record = store
            .append_conversation(&turn(1), UserType::Offline, false)
            .await
            .unwrap();

        let recent = store.get_recent(1).await.unwrap();
        assert_eq!(recent[0].id, record.id);
        assert_eq!(recent[0].user_type, UserType::Offline);
        assert_eq!(recent[0].timestamp, record.timestamp);
    }

    #[tokio::test]
    async fn test_trim_conversations() {
        let store = Store::open_in_memory().await.unwrap();
        let records: Vec<_> = (0..10).map(turn).collect();
        store.put_conversations(&records, &Preferences::new()).await.unwrap();

        let deleted = store.trim_conversations(3).await.unwrap();
        assert_eq!(deleted, 7);

        let queries: Vec<_> = store
            .get_recent(10)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.query)
            .collect();
        assert_eq!(queries, vec!["query 9", "query 8", "query 7"]);
    }

    #[tokio::test]
    async fn test_put_triggers_eviction_over_ceiling() {
        let store = Store::open_in_memory()
            .await
            .unwrap()
            .with_eviction(EvictionPolicy { max_cache_size: 1, keep_count: 5 });
        let records: Vec<_> = (0..12).map(turn).collect();

        let outcome = store.put_conversations(&records, &Preferences::new()).await.unwrap();

        assert_eq!(outcome.written, 12);
        assert!(outcome.eviction.triggered);
        assert_eq!(outcome.eviction.conversations_deleted, 7);
        assert_eq!(store.count_conversations().await.unwrap(), 5);
    }

    #[test]
    fn test_new_conversation_lenient_timestamp() {
        let json = r#"{"query":"q","response":"r","user_type":"offline","timestamp":"2024-03-01T10:00:00.123456"}"#;
        let record: NewConversation = serde_json::from_str(json).unwrap();
        assert_eq!(record.user_type, Some(UserType::Offline));
        assert!(record.timestamp.is_some());

        let minimal: NewConversation = serde_json::from_str(r#"{"query":"q","response":"r"}"#).unwrap();
        assert!(minimal.user_type.is_none());
        assert!(minimal.timestamp.is_none());
    }

    #[test]
    fn test_new_conversation_requires_text() {
        let result = serde_json::from_str::<NewConversation>(r#"{"query":"q"}"#);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_out_of_range_timestamp_rejected_and_batch_rolled_back() {
        let store = Store::open_in_memory().await.unwrap();
        let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();

        let result = store
            .put_conversations(&[turn(1), turn(2).at(far)], &Preferences::new())
            .await;

        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(store.count_conversations().await.unwrap(), 0);
        assert!(store.get_recent(50).await.unwrap().is_empty());
    }

    #[test]
    fn test_new_conversation_rejects_five_digit_year() {
        let json = r#"{"query":"q","response":"r","timestamp":"+10000-01-01T00:00:00"}"#;
        assert!(serde_json::from_str::<NewConversation>(json).is_err());
    }
}
