use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ParseError;

// User identity = platform account UUID (issued by the identity domain)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, ParseError> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A recommendable item. Every item on the platform is a course.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct CourseId(pub Uuid);

impl CourseId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, ParseError> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for CourseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// The algorithm that produced a recommendation row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CollaborativeFiltering,
    SkillAdjacency,
    SocialSignal,
    Trending,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::CollaborativeFiltering,
        Strategy::SkillAdjacency,
        Strategy::SocialSignal,
        Strategy::Trending,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::CollaborativeFiltering => "collaborative_filtering",
            Strategy::SkillAdjacency => "skill_adjacency",
            Strategy::SocialSignal => "social_signal",
            Strategy::Trending => "trending",
        }
    }

    /// Section key used when recommendations are grouped for display.
    pub fn section(&self) -> &'static str {
        match self {
            Strategy::CollaborativeFiltering => "because_you_completed",
            Strategy::SkillAdjacency => "next_level_skills",
            Strategy::SocialSignal => "friends_are_learning",
            Strategy::Trending => "trending_now",
        }
    }

    /// Human-readable section heading.
    pub fn section_title(&self) -> &'static str {
        match self {
            Strategy::CollaborativeFiltering => "Because You Completed",
            Strategy::SkillAdjacency => "Next Level Skills",
            Strategy::SocialSignal => "Friends Are Learning",
            Strategy::Trending => "Trending Now",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| ParseError::Strategy(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

/// Who may see an activity event besides its actor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Friends,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Friends => "friends",
            Visibility::Private => "private",
        }
    }

    /// Whether followers of the actor see the event in their feed.
    pub fn shown_to_followers(&self) -> bool {
        matches!(self, Visibility::Public | Visibility::Friends)
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "friends" => Ok(Visibility::Friends),
            "private" => Ok(Visibility::Private),
            other => Err(ParseError::Visibility(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ActivityType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    ModuleCompleted,
    CourseCompleted,
    ExerciseSolved,
    AchievementEarned,
    ReviewPassed,
    OptimizationAchieved,
    UserFollowed,
}

impl ActivityType {
    pub const ALL: [ActivityType; 7] = [
        ActivityType::ModuleCompleted,
        ActivityType::CourseCompleted,
        ActivityType::ExerciseSolved,
        ActivityType::AchievementEarned,
        ActivityType::ReviewPassed,
        ActivityType::OptimizationAchieved,
        ActivityType::UserFollowed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::ModuleCompleted => "module_completed",
            ActivityType::CourseCompleted => "course_completed",
            ActivityType::ExerciseSolved => "exercise_solved",
            ActivityType::AchievementEarned => "achievement_earned",
            ActivityType::ReviewPassed => "review_passed",
            ActivityType::OptimizationAchieved => "optimization_achieved",
            ActivityType::UserFollowed => "user_followed",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActivityType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseError::ActivityType(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Rarity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        }
    }
}

impl FromStr for Rarity {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "common" => Ok(Rarity::Common),
            "rare" => Ok(Rarity::Rare),
            "epic" => Ok(Rarity::Epic),
            "legendary" => Ok(Rarity::Legendary),
            other => Err(ParseError::Rarity(other.to_string())),
        }
    }
}
