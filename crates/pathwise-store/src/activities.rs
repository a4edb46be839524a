//! Activity ledger: append-only events and the follower feed.

use rusqlite::{params, Connection};

use pathwise_shared::UserId;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::ActivityEvent;
use crate::sql::{enum_at, metadata_at, ts, ts_at, user_at, uuid_at};

const EVENT_COLUMNS: &str = "a.id, a.actor_user_id, a.activity_type, a.reference_type,
     a.reference_id, a.metadata, a.visibility, a.created_at";

impl Database {
    /// Append one event.  A single INSERT, so it either lands whole or not at all.
    pub fn record_activity(&self, event: &ActivityEvent) -> Result<()> {
        insert_event(self.conn(), event)
    }

    /// Events by accounts `user` follows that followers may see, newest first.
    ///
    /// `limit` is used as given; callers clamp it (see
    /// [`pathwise_shared::constants::feed_limit`]).
    pub fn feed(&self, user: UserId, limit: u32) -> Result<Vec<ActivityEvent>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS}
             FROM activity_events a
             JOIN relationships r ON r.following_id = a.actor_user_id
             WHERE r.follower_id = ?1
               AND a.visibility IN ('public', 'friends')
             ORDER BY a.created_at DESC
             LIMIT ?2"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![user.to_string(), limit], row_to_event)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Public events authored by `actor`, newest first.
    pub fn public_activity(&self, actor: UserId, limit: u32) -> Result<Vec<ActivityEvent>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS}
             FROM activity_events a
             WHERE a.actor_user_id = ?1 AND a.visibility = 'public'
             ORDER BY a.created_at DESC
             LIMIT ?2"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![actor.to_string(), limit], row_to_event)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

/// Shared with the achievement unlock transaction.
pub(crate) fn insert_event(conn: &Connection, event: &ActivityEvent) -> Result<()> {
    if event.actor_user_id.is_nil() {
        return Err(StoreError::Validation("actor user id is required".into()));
    }
    if event.reference_type.trim().is_empty() || event.reference_id.trim().is_empty() {
        return Err(StoreError::Validation("reference is required".into()));
    }

    conn.execute(
        "INSERT INTO activity_events
            (id, actor_user_id, activity_type, reference_type, reference_id,
             metadata, visibility, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            event.id.to_string(),
            event.actor_user_id.to_string(),
            event.activity_type.as_str(),
            event.reference_type,
            event.reference_id,
            serde_json::to_string(&event.metadata)?,
            event.visibility.as_str(),
            ts(&event.created_at),
        ],
    )?;
    Ok(())
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<ActivityEvent> {
    Ok(ActivityEvent {
        id: uuid_at(row, 0)?,
        actor_user_id: user_at(row, 1)?,
        activity_type: enum_at(row, 2)?,
        reference_type: row.get(3)?,
        reference_id: row.get(4)?,
        metadata: metadata_at(row, 5)?,
        visibility: enum_at(row, 6)?,
        created_at: ts_at(row, 7)?,
    })
}
