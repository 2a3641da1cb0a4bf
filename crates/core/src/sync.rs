//! Offline record reconciliation.
//!
//! Sync is local bookkeeping, not confirmed remote delivery: every unsynced
//! row is flipped to synced and the incoming records are appended already
//! synced, in one transaction. Nothing is deduplicated, so resubmitting the
//! same records stores them again.

use crate::Error;
use crate::store::conversations::insert_conversation;
use crate::store::{NewConversation, Store, UserType, timestamp};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Result of a sync pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SyncOutcome {
    /// Rows flipped to synced plus incoming rows appended.
    pub synced_count: u64,
    /// Previously unsynced rows that were flipped.
    pub marked_count: u64,
    /// Incoming rows appended.
    pub inserted_count: u64,
    #[serde(with = "timestamp::fixed")]
    #[schemars(with = "String")]
    pub sync_timestamp: DateTime<Utc>,
}

impl Store {
    /// Mark all unsynced conversations synced and append `incoming` as synced.
    ///
    /// Incoming records without a `user_type` are stored as
    /// [`UserType::Offline`]. Eviction does not run here.
    pub async fn sync(&self, incoming: &[NewConversation]) -> Result<SyncOutcome, Error> {
        let incoming = incoming.to_vec();
        let outcome = self
            .conn
            .call(move |conn| -> Result<SyncOutcome, Error> {
                let now = timestamp::now();
                let tx = conn.transaction()?;
                let marked = tx.execute("UPDATE conversations SET is_synced = 1 WHERE is_synced = 0", [])?;
                for record in &incoming {
                    insert_conversation(&tx, record, UserType::Offline, true, &now)?;
                }
                tx.commit()?;

                Ok(SyncOutcome {
                    synced_count: (marked + incoming.len()) as u64,
                    marked_count: marked as u64,
                    inserted_count: incoming.len() as u64,
                    sync_timestamp: now,
                })
            })
            .await
            .map_err(Error::from)?;

        tracing::info!(
            synced = outcome.synced_count,
            marked = outcome.marked_count,
            inserted = outcome.inserted_count,
            "offline data synced"
        );
        Ok(outcome)
    }
}
