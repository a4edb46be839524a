//! In-memory providers and a scratch database for engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};

use pathwise_shared::{CourseId, UserId};
use pathwise_store::Database;

use crate::error::ProviderError;
use crate::providers::{
    Archetype, BehaviorStats, CourseInfo, CourseProgress, IdentityProvider, ProviderResult,
};

pub(crate) fn temp_db() -> (Database, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(&dir.path().join("engine.db"), StdDuration::from_secs(5)).unwrap();
    (db, dir)
}

#[derive(Default)]
pub(crate) struct FakeProgress {
    pub completed: HashMap<UserId, HashSet<CourseId>>,
    pub started: HashMap<UserId, HashSet<CourseId>>,
    pub courses: Vec<CourseInfo>,
    pub skills: HashMap<CourseId, Vec<String>>,
    pub enrollments: HashMap<CourseId, Vec<DateTime<Utc>>>,
    pub stats: HashMap<UserId, BehaviorStats>,
    /// Make every skill lookup fail.
    pub skills_down: bool,
    /// Make every call fail.
    pub all_down: bool,
    /// Runs inside `behavioral_snapshot`, before the stats are returned.
    pub on_snapshot: Option<Box<dyn Fn() + Send + Sync>>,
}

impl FakeProgress {
    pub fn add_course(&mut self, category: &str, skills: &[&str]) -> CourseId {
        let id = CourseId::new();
        self.courses.push(CourseInfo {
            id,
            category: category.into(),
        });
        self.skills
            .insert(id, skills.iter().map(|s| s.to_string()).collect());
        id
    }

    pub fn complete(&mut self, user: UserId, course: CourseId) {
        self.completed.entry(user).or_default().insert(course);
        self.started.entry(user).or_default().insert(course);
    }

    pub fn start(&mut self, user: UserId, course: CourseId) {
        self.started.entry(user).or_default().insert(course);
    }

    pub fn enroll_at(&mut self, course: CourseId, at: DateTime<Utc>) {
        self.enrollments.entry(course).or_default().push(at);
    }

    pub fn shared(self) -> Arc<dyn CourseProgress> {
        Arc::new(self)
    }

    fn check(&self) -> ProviderResult<()> {
        if self.all_down {
            return Err(ProviderError::Unavailable("course progress".into()));
        }
        Ok(())
    }
}

impl CourseProgress for FakeProgress {
    fn completed_courses(&self, user: UserId) -> ProviderResult<HashSet<CourseId>> {
        self.check()?;
        Ok(self.completed.get(&user).cloned().unwrap_or_default())
    }

    fn started_courses(&self, user: UserId) -> ProviderResult<HashSet<CourseId>> {
        self.check()?;
        Ok(self.started.get(&user).cloned().unwrap_or_default())
    }

    fn learners_who_completed(&self, course: CourseId) -> ProviderResult<Vec<UserId>> {
        self.check()?;
        let mut learners: Vec<_> = self
            .completed
            .iter()
            .filter(|(_, done)| done.contains(&course))
            .map(|(user, _)| *user)
            .collect();
        learners.sort();
        Ok(learners)
    }

    fn catalog(&self) -> ProviderResult<Vec<CourseInfo>> {
        self.check()?;
        Ok(self.courses.clone())
    }

    fn course_skills(&self, course: CourseId) -> ProviderResult<Vec<String>> {
        self.check()?;
        if self.skills_down {
            return Err(ProviderError::Unavailable("skill catalog".into()));
        }
        Ok(self.skills.get(&course).cloned().unwrap_or_default())
    }

    fn courses_for_skill(&self, skill: &str) -> ProviderResult<Vec<CourseId>> {
        self.check()?;
        if self.skills_down {
            return Err(ProviderError::Unavailable("skill catalog".into()));
        }
        Ok(self
            .courses
            .iter()
            .filter(|c| {
                self.skills
                    .get(&c.id)
                    .is_some_and(|skills| skills.iter().any(|s| s == skill))
            })
            .map(|c| c.id)
            .collect())
    }

    fn enrollment_timestamps(
        &self,
        course: CourseId,
        since: DateTime<Utc>,
    ) -> ProviderResult<Vec<DateTime<Utc>>> {
        self.check()?;
        Ok(self
            .enrollments
            .get(&course)
            .map(|all| all.iter().copied().filter(|ts| *ts > since).collect())
            .unwrap_or_default())
    }

    fn behavioral_snapshot(&self, user: UserId) -> ProviderResult<BehaviorStats> {
        self.check()?;
        if let Some(hook) = &self.on_snapshot {
            hook();
        }
        let mut stats = self.stats.get(&user).cloned().unwrap_or_default();
        stats.courses_completed = self.completed.get(&user).map_or(0, |c| c.len() as u32);
        Ok(stats)
    }
}

#[derive(Default)]
pub(crate) struct FakeIdentity {
    pub archetypes: HashMap<UserId, String>,
}

impl IdentityProvider for FakeIdentity {
    fn archetype(&self, user: UserId) -> ProviderResult<Option<Archetype>> {
        Ok(self
            .archetypes
            .get(&user)
            .map(|name| Archetype { name: name.clone() }))
    }
}
