//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the HTTP layer as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use pathwise_shared::{ActivityType, CourseId, Strategy, UserId, Visibility};

/// Opaque key-value metadata attached to events and recommendations.
pub type Metadata = Map<String, Value>;

// ---------------------------------------------------------------------------
// Relationship
// ---------------------------------------------------------------------------

/// A directed follow edge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelationshipEdge {
    pub follower_id: UserId,
    pub following_id: UserId,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

/// One immutable entry in the activity ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityEvent {
    pub id: Uuid,
    pub actor_user_id: UserId,
    pub activity_type: ActivityType,
    /// Kind of object the event is about (`course`, `achievement`, `user`, ...).
    pub reference_type: String,
    pub reference_id: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
}

impl ActivityEvent {
    /// Build a new event stamped with a fresh id and the current time.
    pub fn new(
        actor_user_id: UserId,
        activity_type: ActivityType,
        reference_type: impl Into<String>,
        reference_id: impl Into<String>,
        visibility: Visibility,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_user_id,
            activity_type,
            reference_type: reference_type.into(),
            reference_id: reference_id.into(),
            metadata: Metadata::new(),
            visibility,
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

/// A scored suggestion of a course for a user, produced by one strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    /// Row id.  Preserved when an existing (user, item, strategy) row is
    /// overwritten, so the id passed in on upsert may be discarded.
    pub id: Uuid,
    pub user_id: UserId,
    pub item_id: CourseId,
    pub strategy: Strategy,
    /// 0..=100
    pub match_score: u8,
    pub reason: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Trending
// ---------------------------------------------------------------------------

/// One ranked row of the trending snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendingEntry {
    pub item_id: CourseId,
    pub velocity: f64,
    pub signups_24h: u32,
    pub signups_previous_24h: u32,
    /// 1-based, dense within one snapshot.
    pub rank: u32,
    pub category: String,
    pub calculated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Achievements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnlockedAchievement {
    pub user_id: UserId,
    pub achievement_id: String,
    pub unlocked_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Catalog mirror (owned by the course and identity domains)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub category: String,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Enrollment {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Aggregated learning counters maintained by the progress domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LearnerStats {
    pub user_id: UserId,
    pub modules_completed: u32,
    pub exercises_solved: u32,
    pub perfect_scores: u32,
    pub average_review_score: f64,
    pub consecutive_days: u32,
    pub total_hours: f64,
}
