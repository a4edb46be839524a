//! Achievement sweep for one user.
//!
//! Each (user, achievement) pair only ever moves from locked to unlocked.
//! Held achievements are never re-evaluated, so a stat that later drops
//! below a threshold does not take anything away.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use pathwise_shared::{ActivityType, UserId, Visibility};
use pathwise_store::{ActivityEvent, Database, StoreError, UnlockedAchievement};

use crate::achievements::{AchievementCatalog, AchievementDefinition};
use crate::error::Result;
use crate::providers::CourseProgress;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlockFailure {
    pub achievement_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationOutcome {
    pub user_id: UserId,
    /// Previously held plus newly unlocked.
    pub achievements: Vec<UnlockedAchievement>,
    pub newly_unlocked: Vec<String>,
    /// Unlocks whose write failed; they stay locked until the next sweep.
    pub failures: Vec<UnlockFailure>,
}

pub(crate) fn evaluate(
    db: &mut Database,
    progress: &dyn CourseProgress,
    catalog: &AchievementCatalog,
    user: UserId,
    now: DateTime<Utc>,
) -> Result<EvaluationOutcome> {
    let mut achievements = db.unlocked_achievements(user)?;
    let held: HashSet<String> = achievements
        .iter()
        .map(|a| a.achievement_id.clone())
        .collect();
    let stats = progress.behavioral_snapshot(user)?;

    let mut newly_unlocked = Vec::new();
    let mut failures = Vec::new();

    for definition in catalog.definitions() {
        if held.contains(&definition.id) || !definition.criteria.is_met(&stats) {
            continue;
        }

        let unlock = UnlockedAchievement {
            user_id: user,
            achievement_id: definition.id.clone(),
            unlocked_at: now,
        };
        match db.unlock_achievement(&unlock, &announcement(user, definition, now)) {
            Ok(true) => {
                info!(user = %user, achievement = %definition.id, "achievement unlocked");
                newly_unlocked.push(definition.id.clone());
                achievements.push(unlock);
            }
            // Raced with another sweep; report the row that won.
            Ok(false) => match db.unlocked_achievement(user, &definition.id) {
                Ok(Some(winner)) => achievements.push(winner),
                Ok(None) => {}
                Err(e) => failures.push(failure(user, definition, e)),
            },
            Err(e) => failures.push(failure(user, definition, e)),
        }
    }

    Ok(EvaluationOutcome {
        user_id: user,
        achievements,
        newly_unlocked,
        failures,
    })
}

fn failure(user: UserId, definition: &AchievementDefinition, err: StoreError) -> UnlockFailure {
    warn!(user = %user, achievement = %definition.id, error = %err, "unlock failed");
    UnlockFailure {
        achievement_id: definition.id.clone(),
        reason: err.to_string(),
    }
}

/// Achievements are always broadcast publicly.
fn announcement(user: UserId, definition: &AchievementDefinition, now: DateTime<Utc>) -> ActivityEvent {
    ActivityEvent::new(
        user,
        ActivityType::AchievementEarned,
        "achievement",
        definition.id.as_str(),
        Visibility::Public,
    )
    .with_metadata("name", definition.name.as_str())
    .with_metadata("rarity", definition.rarity.as_str())
    .at(now)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use pathwise_shared::{ActivityType, UserId};

    use crate::achievements::AchievementCatalog;
    use crate::providers::BehaviorStats;
    use crate::test_support::{temp_db, FakeProgress};

    use super::*;

    #[test]
    fn unlocks_once_and_keeps_first_timestamp() {
        let (mut db, _dir) = temp_db();
        let mut progress = FakeProgress::default();
        let catalog = AchievementCatalog::builtin();
        let me = UserId::new();
        let course = progress.add_course("web", &[]);
        progress.complete(me, course);

        let first_at = Utc::now() - Duration::hours(1);
        let first = evaluate(&mut db, &progress, &catalog, me, first_at).unwrap();
        assert_eq!(first.newly_unlocked, vec!["first_steps".to_string()]);
        assert!(first.failures.is_empty());

        let second = evaluate(&mut db, &progress, &catalog, me, Utc::now()).unwrap();
        assert!(second.newly_unlocked.is_empty());
        assert_eq!(second.achievements.len(), 1);
        assert_eq!(
            second.achievements[0].unlocked_at.timestamp_micros(),
            first_at.timestamp_micros()
        );

        let earned: Vec<_> = db
            .public_activity(me, 10)
            .unwrap()
            .into_iter()
            .filter(|e| e.activity_type == ActivityType::AchievementEarned)
            .collect();
        assert_eq!(earned.len(), 1);
        assert_eq!(earned[0].reference_id, "first_steps");
        assert_eq!(earned[0].metadata["rarity"], "common");
    }

    #[test]
    fn returns_held_plus_new() {
        let (mut db, _dir) = temp_db();
        let mut progress = FakeProgress::default();
        let catalog = AchievementCatalog::builtin();
        let me = UserId::new();
        let course = progress.add_course("web", &[]);
        progress.complete(me, course);
        evaluate(&mut db, &progress, &catalog, me, Utc::now()).unwrap();

        progress.stats.insert(
            me,
            BehaviorStats {
                consecutive_days: 8,
                ..Default::default()
            },
        );
        let outcome = evaluate(&mut db, &progress, &catalog, me, Utc::now()).unwrap();
        assert_eq!(outcome.newly_unlocked, vec!["week_streak".to_string()]);
        let mut ids: Vec<_> = outcome
            .achievements
            .iter()
            .map(|a| a.achievement_id.as_str())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["first_steps", "week_streak"]);
    }

    #[test]
    fn lost_race_reports_the_winning_unlock() {
        let (mut db, dir) = temp_db();
        let mut progress = FakeProgress::default();
        let catalog = AchievementCatalog::builtin();
        let me = UserId::new();
        let course = progress.add_course("web", &[]);
        progress.complete(me, course);

        // A concurrent sweep on another connection unlocks first, after this
        // sweep has loaded what the user holds.
        let winner_at = Utc::now() - Duration::minutes(5);
        let path = dir.path().join("engine.db");
        let first_steps = catalog.get("first_steps").unwrap().clone();
        progress.on_snapshot = Some(Box::new(move || {
            let mut other = Database::open_at(&path, std::time::Duration::from_secs(5)).unwrap();
            let unlock = UnlockedAchievement {
                user_id: me,
                achievement_id: first_steps.id.clone(),
                unlocked_at: winner_at,
            };
            other
                .unlock_achievement(&unlock, &announcement(me, &first_steps, winner_at))
                .unwrap();
        }));

        let outcome = evaluate(&mut db, &progress, &catalog, me, Utc::now()).unwrap();
        assert!(outcome.newly_unlocked.is_empty());
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.achievements.len(), 1);
        assert_eq!(outcome.achievements[0].achievement_id, "first_steps");
        assert_eq!(
            outcome.achievements[0].unlocked_at.timestamp_micros(),
            winner_at.timestamp_micros()
        );
    }

    #[test]
    fn provider_outage_fails_the_sweep() {
        let (mut db, _dir) = temp_db();
        let progress = FakeProgress {
            all_down: true,
            ..Default::default()
        };
        let catalog = AchievementCatalog::builtin();
        assert!(evaluate(&mut db, &progress, &catalog, UserId::new(), Utc::now()).is_err());
    }
}
