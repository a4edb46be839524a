//! Social graph: directed follow edges.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use pathwise_shared::{ActivityType, UserId, Visibility};

use crate::activities::insert_event;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{ActivityEvent, RelationshipEdge};
use crate::sql::{ts, ts_at, user_at};

impl Database {
    // ------------------------------------------------------------------
    // Write
    // ------------------------------------------------------------------

    /// Create the edge `follower -> following` and announce it with a public
    /// `user_followed` event.
    ///
    /// Edge and event are written in one transaction.  Returns `true` if the
    /// edge was created, `false` if it already existed (nothing is written).
    /// Following yourself is rejected.
    pub fn follow(&self, follower: UserId, following: UserId) -> Result<bool> {
        if follower.is_nil() || following.is_nil() {
            return Err(StoreError::Validation("user id is required".into()));
        }
        if follower == following {
            return Err(StoreError::Validation("cannot follow yourself".into()));
        }

        let now = Utc::now();
        let tx = self.conn().unchecked_transaction()?;
        let created = tx.execute(
            "INSERT OR IGNORE INTO relationships (follower_id, following_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![follower.to_string(), following.to_string(), ts(&now)],
        )? > 0;

        if created {
            let announcement = ActivityEvent::new(
                follower,
                ActivityType::UserFollowed,
                "user",
                following.to_string(),
                Visibility::Public,
            )
            .at(now);
            insert_event(&tx, &announcement)?;
        }
        tx.commit()?;

        if created {
            tracing::debug!(follower = %follower, following = %following, "follow edge created");
        }
        Ok(created)
    }

    /// Remove the edge `follower -> following`, failing with
    /// [`StoreError::NotFound`] if there is none.
    pub fn unfollow(&self, follower: UserId, following: UserId) -> Result<()> {
        let affected = self.conn().execute(
            "DELETE FROM relationships WHERE follower_id = ?1 AND following_id = ?2",
            params![follower.to_string(), following.to_string()],
        )?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Users following `user`, newest edge first.
    pub fn followers(&self, user: UserId) -> Result<Vec<UserId>> {
        let mut stmt = self.conn().prepare(
            "SELECT follower_id FROM relationships
             WHERE following_id = ?1
             ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![user.to_string()], |row| user_at(row, 0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Users that `user` follows, newest edge first.
    pub fn following(&self, user: UserId) -> Result<Vec<UserId>> {
        let mut stmt = self.conn().prepare(
            "SELECT following_id FROM relationships
             WHERE follower_id = ?1
             ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![user.to_string()], |row| user_at(row, 0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub fn follower_count(&self, user: UserId) -> Result<u32> {
        Ok(self.conn().query_row(
            "SELECT COUNT(*) FROM relationships WHERE following_id = ?1",
            params![user.to_string()],
            |row| row.get(0),
        )?)
    }

    pub fn following_count(&self, user: UserId) -> Result<u32> {
        Ok(self.conn().query_row(
            "SELECT COUNT(*) FROM relationships WHERE follower_id = ?1",
            params![user.to_string()],
            |row| row.get(0),
        )?)
    }

    /// Fetch a single edge, if present.
    pub fn relationship(
        &self,
        follower: UserId,
        following: UserId,
    ) -> Result<Option<RelationshipEdge>> {
        let edge = self
            .conn()
            .query_row(
                "SELECT follower_id, following_id, created_at FROM relationships
                 WHERE follower_id = ?1 AND following_id = ?2",
                params![follower.to_string(), following.to_string()],
                |row| {
                    Ok(RelationshipEdge {
                        follower_id: user_at(row, 0)?,
                        following_id: user_at(row, 1)?,
                        created_at: ts_at(row, 2)?,
                    })
                },
            )
            .optional()?;
        Ok(edge)
    }
}

#[cfg(test)]
mod tests {
    use pathwise_shared::{ActivityType, UserId};

    use crate::database::tests::temp_db;
    use crate::error::StoreError;

    #[test]
    fn follow_is_idempotent() {
        let (db, _dir) = temp_db();
        let (a, b) = (UserId::new(), UserId::new());

        assert!(db.follow(a, b).unwrap());
        assert!(!db.follow(a, b).unwrap());

        assert_eq!(db.following(a).unwrap(), vec![b]);
        assert_eq!(db.followers(b).unwrap(), vec![a]);
        assert_eq!(db.following_count(a).unwrap(), 1);
        assert!(db.relationship(a, b).unwrap().is_some());
        assert!(db.relationship(b, a).unwrap().is_none());
    }

    #[test]
    fn self_follow_rejected() {
        let (db, _dir) = temp_db();
        for _ in 0..5 {
            let u = UserId::new();
            assert!(matches!(db.follow(u, u), Err(StoreError::Validation(_))));
        }
        assert_eq!(db.following_count(UserId::new()).unwrap(), 0);
    }

    #[test]
    fn unfollow_missing_edge_is_not_found() {
        let (db, _dir) = temp_db();
        let (a, b) = (UserId::new(), UserId::new());

        assert!(matches!(db.unfollow(a, b), Err(StoreError::NotFound)));

        db.follow(a, b).unwrap();
        db.unfollow(a, b).unwrap();
        assert!(db.following(a).unwrap().is_empty());
        assert!(matches!(db.unfollow(a, b), Err(StoreError::NotFound)));
    }

    #[test]
    fn new_edge_is_announced_once() {
        let (db, _dir) = temp_db();
        let (a, b) = (UserId::new(), UserId::new());

        db.follow(a, b).unwrap();
        db.follow(a, b).unwrap();

        let events = db.public_activity(a, 10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].activity_type, ActivityType::UserFollowed);
        assert_eq!(events[0].reference_type, "user");
        assert_eq!(events[0].reference_id, b.to_string());
    }

    #[test]
    fn failed_announcement_rolls_back_edge() {
        let (db, _dir) = temp_db();
        let (a, b) = (UserId::new(), UserId::new());
        db.conn()
            .execute_batch(
                "CREATE TRIGGER reject_events BEFORE INSERT ON activity_events
                 BEGIN SELECT RAISE(ABORT, 'ledger unavailable'); END;",
            )
            .unwrap();

        assert!(db.follow(a, b).is_err());
        assert!(db.relationship(a, b).unwrap().is_none());

        db.conn().execute_batch("DROP TRIGGER reject_events").unwrap();
        assert!(db.follow(a, b).unwrap());
        assert_eq!(db.public_activity(a, 10).unwrap().len(), 1);
    }
}
