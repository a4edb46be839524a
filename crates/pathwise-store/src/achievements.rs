use rusqlite::{params, OptionalExtension};

use pathwise_shared::UserId;

use crate::activities::insert_event;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{ActivityEvent, UnlockedAchievement};
use crate::sql::{ts, ts_at, user_at};

impl Database {
    /// Record an unlock together with the event announcing it.
    ///
    /// Both rows are written in one transaction.  If the user already holds
    /// the achievement nothing is written (the original unlock time stays)
    /// and `false` is returned.
    pub fn unlock_achievement(
        &mut self,
        unlock: &UnlockedAchievement,
        announcement: &ActivityEvent,
    ) -> Result<bool> {
        if unlock.user_id.is_nil() || unlock.achievement_id.trim().is_empty() {
            return Err(StoreError::Validation(
                "user and achievement ids are required".into(),
            ));
        }

        let tx = self.conn_mut().transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO unlocked_achievements (user_id, achievement_id, unlocked_at)
             VALUES (?1, ?2, ?3)",
            params![
                unlock.user_id.to_string(),
                unlock.achievement_id,
                ts(&unlock.unlocked_at),
            ],
        )? > 0;

        if inserted {
            insert_event(&tx, announcement)?;
        }
        tx.commit()?;

        Ok(inserted)
    }

    /// The stored unlock of one achievement, if `user` holds it.
    pub fn unlocked_achievement(
        &self,
        user: UserId,
        achievement_id: &str,
    ) -> Result<Option<UnlockedAchievement>> {
        let unlock = self
            .conn()
            .query_row(
                "SELECT user_id, achievement_id, unlocked_at
                 FROM unlocked_achievements
                 WHERE user_id = ?1 AND achievement_id = ?2",
                params![user.to_string(), achievement_id],
                |row| {
                    Ok(UnlockedAchievement {
                        user_id: user_at(row, 0)?,
                        achievement_id: row.get(1)?,
                        unlocked_at: ts_at(row, 2)?,
                    })
                },
            )
            .optional()?;
        Ok(unlock)
    }

    /// Everything `user` has unlocked, oldest first.
    pub fn unlocked_achievements(&self, user: UserId) -> Result<Vec<UnlockedAchievement>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, achievement_id, unlocked_at
             FROM unlocked_achievements
             WHERE user_id = ?1
             ORDER BY unlocked_at ASC, achievement_id ASC",
        )?;
        let rows = stmt.query_map(params![user.to_string()], |row| {
            Ok(UnlockedAchievement {
                user_id: user_at(row, 0)?,
                achievement_id: row.get(1)?,
                unlocked_at: ts_at(row, 2)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}
