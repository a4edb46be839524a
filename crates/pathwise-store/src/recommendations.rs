//! CRUD operations for [`Recommendation`] records.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use pathwise_shared::constants::MAX_MATCH_SCORE;
use pathwise_shared::{Strategy, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Recommendation;
use crate::sql::{course_at, enum_at, metadata_at, opt_ts_at, ts, ts_at, user_at, uuid_at};

impl Database {
    // ------------------------------------------------------------------
    // Upsert
    // ------------------------------------------------------------------

    /// Write or overwrite the row for `(user, item, strategy)`.
    ///
    /// On conflict the score, reason, metadata and both timestamps are
    /// replaced and the existing row id is kept.  Returns the id of the row.
    pub fn upsert_recommendation(&self, rec: &Recommendation) -> Result<Uuid> {
        if rec.user_id.is_nil() || rec.item_id.is_nil() {
            return Err(StoreError::Validation("user and item ids are required".into()));
        }
        if rec.match_score > MAX_MATCH_SCORE {
            return Err(StoreError::Validation(format!(
                "match score {} exceeds {}",
                rec.match_score, MAX_MATCH_SCORE
            )));
        }

        let id = self.conn().query_row(
            "INSERT INTO recommendations
                (id, user_id, item_id, strategy, match_score, reason, metadata, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(user_id, item_id, strategy) DO UPDATE SET
                match_score = excluded.match_score,
                reason      = excluded.reason,
                metadata    = excluded.metadata,
                created_at  = excluded.created_at,
                expires_at  = excluded.expires_at
             RETURNING id",
            params![
                rec.id.to_string(),
                rec.user_id.to_string(),
                rec.item_id.to_string(),
                rec.strategy.as_str(),
                rec.match_score,
                rec.reason,
                serde_json::to_string(&rec.metadata)?,
                ts(&rec.created_at),
                rec.expires_at.as_ref().map(ts),
            ],
            |row| uuid_at(row, 0),
        )?;
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Live recommendations for `user`, best match first.
    ///
    /// `strategy = None` returns every strategy.
    pub fn live_recommendations(
        &self,
        user: UserId,
        strategy: Option<Strategy>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Recommendation>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_id, item_id, strategy, match_score, reason, metadata,
                    created_at, expires_at
             FROM recommendations
             WHERE user_id = ?1
               AND (expires_at IS NULL OR expires_at > ?2)
               AND (?3 IS NULL OR strategy = ?3)
             ORDER BY match_score DESC, created_at DESC",
        )?;

        let rows = stmt.query_map(
            params![
                user.to_string(),
                ts(&now),
                strategy.map(|s| s.as_str()),
            ],
            row_to_recommendation,
        )?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete every row whose expiry has passed.  Returns the number removed.
    pub fn purge_expired_recommendations(&self, now: DateTime<Utc>) -> Result<usize> {
        let affected = self.conn().execute(
            "DELETE FROM recommendations WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            params![ts(&now)],
        )?;
        Ok(affected)
    }
}

fn row_to_recommendation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Recommendation> {
    Ok(Recommendation {
        id: uuid_at(row, 0)?,
        user_id: user_at(row, 1)?,
        item_id: course_at(row, 2)?,
        strategy: enum_at(row, 3)?,
        match_score: row.get(4)?,
        reason: row.get(5)?,
        metadata: metadata_at(row, 6)?,
        created_at: ts_at(row, 7)?,
        expires_at: opt_ts_at(row, 8)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use pathwise_shared::{CourseId, Strategy, UserId};

    use crate::database::tests::temp_db;
    use crate::models::{Metadata, Recommendation};

    fn rec(user: UserId, item: CourseId, strategy: Strategy, score: u8) -> Recommendation {
        let now = Utc::now();
        Recommendation {
            id: Uuid::new_v4(),
            user_id: user,
            item_id: item,
            strategy,
            match_score: score,
            reason: "because".into(),
            metadata: Metadata::new(),
            created_at: now,
            expires_at: Some(now + Duration::days(7)),
        }
    }

    #[test]
    fn upsert_overwrites_and_keeps_id() {
        let (db, _dir) = temp_db();
        let user = UserId::new();
        let item = CourseId::new();

        let first = db
            .upsert_recommendation(&rec(user, item, Strategy::SocialSignal, 70))
            .unwrap();
        let mut again = rec(user, item, Strategy::SocialSignal, 85);
        again.reason = "updated".into();
        let second = db.upsert_recommendation(&again).unwrap();

        assert_eq!(first, second);
        let live = db.live_recommendations(user, None, Utc::now()).unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].match_score, 85);
        assert_eq!(live[0].reason, "updated");
    }

    #[test]
    fn same_item_different_strategies_coexist() {
        let (db, _dir) = temp_db();
        let user = UserId::new();
        let item = CourseId::new();

        db.upsert_recommendation(&rec(user, item, Strategy::Trending, 40))
            .unwrap();
        db.upsert_recommendation(&rec(user, item, Strategy::SkillAdjacency, 88))
            .unwrap();

        let all = db.live_recommendations(user, None, Utc::now()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].strategy, Strategy::SkillAdjacency);

        let trending = db
            .live_recommendations(user, Some(Strategy::Trending), Utc::now())
            .unwrap();
        assert_eq!(trending.len(), 1);
        assert_eq!(trending[0].match_score, 40);
    }

    #[test]
    fn expired_rows_hidden_then_purged() {
        let (db, _dir) = temp_db();
        let user = UserId::new();
        let now = Utc::now();

        let mut stale = rec(user, CourseId::new(), Strategy::Trending, 30);
        stale.expires_at = Some(now - Duration::minutes(1));
        let mut forever = rec(user, CourseId::new(), Strategy::Trending, 20);
        forever.expires_at = None;
        db.upsert_recommendation(&stale).unwrap();
        db.upsert_recommendation(&forever).unwrap();

        let live = db.live_recommendations(user, None, now).unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].expires_at, None);

        assert_eq!(db.purge_expired_recommendations(now).unwrap(), 1);
        assert_eq!(db.purge_expired_recommendations(now).unwrap(), 0);
    }

    #[test]
    fn score_above_hundred_rejected() {
        let (db, _dir) = temp_db();
        let bad = rec(UserId::new(), CourseId::new(), Strategy::Trending, 101);
        assert!(db.upsert_recommendation(&bad).is_err());
    }
}
