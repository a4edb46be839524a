//! Capability interfaces for data owned by other domains.
//!
//! The engine is handed implementations of these traits at construction.
//! It only ever reads through them.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pathwise_shared::{CourseId, UserId};

use crate::error::ProviderError;

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Catalog facts the trending refresh needs about a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseInfo {
    pub id: CourseId,
    pub category: String,
}

/// Behavioral counters the achievement criteria are evaluated against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorStats {
    pub courses_completed: u32,
    pub modules_completed: u32,
    pub exercises_solved: u32,
    pub perfect_scores: u32,
    pub average_review_score: f64,
    pub consecutive_days: u32,
    pub total_hours: f64,
}

/// Learner persona assigned by the identity domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archetype {
    pub name: String,
}

/// Course progress and catalog reads.
pub trait CourseProgress: Send + Sync {
    fn completed_courses(&self, user: UserId) -> ProviderResult<HashSet<CourseId>>;

    /// Courses the user has enrolled in, completed or not.
    fn started_courses(&self, user: UserId) -> ProviderResult<HashSet<CourseId>>;

    fn learners_who_completed(&self, course: CourseId) -> ProviderResult<Vec<UserId>>;

    fn catalog(&self) -> ProviderResult<Vec<CourseInfo>>;

    fn course_skills(&self, course: CourseId) -> ProviderResult<Vec<String>>;

    fn courses_for_skill(&self, skill: &str) -> ProviderResult<Vec<CourseId>>;

    /// Enrollment start times for `course` strictly after `since`.
    fn enrollment_timestamps(
        &self,
        course: CourseId,
        since: DateTime<Utc>,
    ) -> ProviderResult<Vec<DateTime<Utc>>>;

    fn behavioral_snapshot(&self, user: UserId) -> ProviderResult<BehaviorStats>;
}

pub trait IdentityProvider: Send + Sync {
    fn archetype(&self, user: UserId) -> ProviderResult<Option<Archetype>>;
}
