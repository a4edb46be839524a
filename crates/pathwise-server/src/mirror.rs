//! Provider adapter over the catalog mirror tables.
//!
//! The course and identity domains sync into `courses`, `enrollments`,
//! `learner_stats` and `user_archetypes`; this adapter serves the engine's
//! provider traits from them on its own connection, so provider reads never
//! wait on the API's write connection.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use pathwise_engine::providers::ProviderResult;
use pathwise_engine::{
    Archetype, BehaviorStats, CourseInfo, CourseProgress, IdentityProvider, ProviderError,
};
use pathwise_shared::{CourseId, UserId};
use pathwise_store::{Database, StoreError};

pub struct CatalogMirror {
    db: Mutex<Database>,
}

impl CatalogMirror {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn read<T>(
        &self,
        what: &str,
        f: impl FnOnce(&Database) -> pathwise_store::Result<T>,
    ) -> ProviderResult<T> {
        let db: MutexGuard<'_, Database> = self
            .db
            .lock()
            .map_err(|_| ProviderError::Unavailable(format!("{what} (connection poisoned)")))?;
        f(&db).map_err(|e| unavailable(what, e))
    }
}

fn unavailable(what: &str, err: StoreError) -> ProviderError {
    if err.is_transient() {
        ProviderError::TimedOut(what.to_string())
    } else {
        tracing::warn!(source = what, error = %err, "catalog mirror read failed");
        ProviderError::Unavailable(what.to_string())
    }
}

impl CourseProgress for CatalogMirror {
    fn completed_courses(&self, user: UserId) -> ProviderResult<HashSet<CourseId>> {
        self.read("completions", |db| db.completed_course_ids(user))
    }

    fn started_courses(&self, user: UserId) -> ProviderResult<HashSet<CourseId>> {
        self.read("enrollments", |db| db.started_course_ids(user))
    }

    fn learners_who_completed(&self, course: CourseId) -> ProviderResult<Vec<UserId>> {
        self.read("completions", |db| db.learners_who_completed(course))
    }

    fn catalog(&self) -> ProviderResult<Vec<CourseInfo>> {
        self.read("course catalog", |db| {
            Ok(db
                .list_courses()?
                .into_iter()
                .map(|c| CourseInfo {
                    id: c.id,
                    category: c.category,
                })
                .collect())
        })
    }

    fn course_skills(&self, course: CourseId) -> ProviderResult<Vec<String>> {
        self.read("course skills", |db| db.course_skills(course))
    }

    fn courses_for_skill(&self, skill: &str) -> ProviderResult<Vec<CourseId>> {
        self.read("course skills", |db| db.courses_with_skill(skill))
    }

    fn enrollment_timestamps(
        &self,
        course: CourseId,
        since: DateTime<Utc>,
    ) -> ProviderResult<Vec<DateTime<Utc>>> {
        self.read("enrollments", |db| db.enrollment_timestamps(course, since))
    }

    fn behavioral_snapshot(&self, user: UserId) -> ProviderResult<BehaviorStats> {
        self.read("learner stats", |db| {
            let courses_completed = db.completed_course_ids(user)?.len() as u32;
            let stats = db.learner_stats(user)?.unwrap_or_default();
            Ok(BehaviorStats {
                courses_completed,
                modules_completed: stats.modules_completed,
                exercises_solved: stats.exercises_solved,
                perfect_scores: stats.perfect_scores,
                average_review_score: stats.average_review_score,
                consecutive_days: stats.consecutive_days,
                total_hours: stats.total_hours,
            })
        })
    }
}

impl IdentityProvider for CatalogMirror {
    fn archetype(&self, user: UserId) -> ProviderResult<Option<Archetype>> {
        self.read("identity", |db| {
            Ok(db.archetype(user)?.map(|name| Archetype { name }))
        })
    }
}
