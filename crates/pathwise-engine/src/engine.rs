//! The discovery engine facade.
//!
//! [`DiscoveryEngine`] owns the read-only collaborators (providers, skill
//! graph, achievement catalog, strategy list) and borrows the store per call,
//! so the caller decides how the connection is shared.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use pathwise_shared::constants::{feed_limit, DEFAULT_TRENDING_LIMIT};
use pathwise_shared::{CourseId, ParseError, Rarity, Strategy, UserId};
use pathwise_store::{
    ActivityEvent, Database, Recommendation, TrendingEntry, UnlockedAchievement,
};

use crate::achievements::{AchievementCatalog, AchievementDefinition};
use crate::config::DiscoveryConfig;
use crate::error::{DiscoveryError, Result};
use crate::evaluator::{self, EvaluationOutcome};
use crate::providers::{CourseProgress, IdentityProvider};
use crate::skill_graph::SkillGraph;
use crate::strategies::{
    default_strategies, run_all, GenerationReport, RecommendationStrategy, StrategyContext,
};
use crate::velocity::{build_snapshot, lookback_start, window_counts};

/// Recent public events shown on a profile.
const PROFILE_ACTIVITY_LIMIT: u32 = 20;

/// Which strategies a recommendation read covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StrategyFilter {
    #[default]
    All,
    Only(Strategy),
}

impl StrategyFilter {
    pub fn strategy(&self) -> Option<Strategy> {
        match self {
            StrategyFilter::All => None,
            StrategyFilter::Only(s) => Some(*s),
        }
    }
}

impl FromStr for StrategyFilter {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "" | "all" => Ok(StrategyFilter::All),
            other => other.parse().map(StrategyFilter::Only),
        }
    }
}

/// One named group of recommendations for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationSection {
    pub title: &'static str,
    pub items: Vec<Recommendation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileAchievement {
    pub id: String,
    pub name: String,
    /// `None` when the definition has since been retired.
    pub rarity: Option<Rarity>,
    pub unlocked_at: DateTime<Utc>,
}

/// The public "living resume" of a learner.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub user_id: UserId,
    pub archetype: Option<String>,
    pub achievements: Vec<ProfileAchievement>,
    pub completed_courses: Vec<CourseId>,
    pub followers: u32,
    pub following: u32,
    pub recent_activity: Vec<ActivityEvent>,
}

pub struct DiscoveryEngine {
    progress: Arc<dyn CourseProgress>,
    identity: Arc<dyn IdentityProvider>,
    skills: Arc<SkillGraph>,
    achievements: Arc<AchievementCatalog>,
    config: DiscoveryConfig,
    strategies: Vec<Box<dyn RecommendationStrategy>>,
}

impl DiscoveryEngine {
    pub fn new(progress: Arc<dyn CourseProgress>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            progress,
            identity,
            skills: Arc::new(SkillGraph::builtin()),
            achievements: Arc::new(AchievementCatalog::builtin()),
            config: DiscoveryConfig::default(),
            strategies: default_strategies(),
        }
    }

    pub fn with_config(mut self, config: DiscoveryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_skill_graph(mut self, skills: SkillGraph) -> Self {
        self.skills = Arc::new(skills);
        self
    }

    pub fn with_achievements(mut self, achievements: AchievementCatalog) -> Self {
        self.achievements = Arc::new(achievements);
        self
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Social graph and activity
    // ------------------------------------------------------------------

    /// Follow `target`.  A new edge is announced with a public
    /// `user_followed` event in the same write; a repeated follow changes
    /// nothing.
    pub fn follow(&self, db: &Database, follower: UserId, target: UserId) -> Result<bool> {
        Ok(db.follow(follower, target)?)
    }

    pub fn unfollow(&self, db: &Database, follower: UserId, target: UserId) -> Result<()> {
        db.unfollow(follower, target).map_err(|e| match DiscoveryError::from(e) {
            DiscoveryError::NotFound(_) => {
                DiscoveryError::NotFound(format!("{follower} does not follow {target}"))
            }
            other => other,
        })
    }

    pub fn followers(&self, db: &Database, user: UserId) -> Result<Vec<UserId>> {
        Ok(db.followers(user)?)
    }

    pub fn following(&self, db: &Database, user: UserId) -> Result<Vec<UserId>> {
        Ok(db.following(user)?)
    }

    pub fn record_activity(&self, db: &Database, event: &ActivityEvent) -> Result<()> {
        Ok(db.record_activity(event)?)
    }

    /// Feed for `user`; `limit` is clamped to the allowed page size.
    pub fn feed(&self, db: &Database, user: UserId, limit: Option<i64>) -> Result<Vec<ActivityEvent>> {
        Ok(db.feed(user, feed_limit(limit))?)
    }

    // ------------------------------------------------------------------
    // Recommendations
    // ------------------------------------------------------------------

    pub fn recommendations(
        &self,
        db: &Database,
        user: UserId,
        filter: StrategyFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<Recommendation>> {
        Ok(db.live_recommendations(user, filter.strategy(), now)?)
    }

    /// Group rows by section, keeping each section's order.  Strategies with
    /// nothing live are left out, so no rows means an empty map.
    pub fn group_by_section(
        recommendations: Vec<Recommendation>,
    ) -> BTreeMap<&'static str, RecommendationSection> {
        let mut sections: BTreeMap<&'static str, RecommendationSection> = BTreeMap::new();
        for rec in recommendations {
            let strategy = rec.strategy;
            sections
                .entry(strategy.section())
                .or_insert_with(|| RecommendationSection {
                    title: strategy.section_title(),
                    items: Vec::new(),
                })
                .items
                .push(rec);
        }
        sections
    }

    pub fn generate_recommendations(&self, db: &Database, user: UserId) -> Result<GenerationReport> {
        self.generate_recommendations_at(db, user, Utc::now())
    }

    /// Run every strategy for `user`.  Strategy failures are reported, not
    /// returned; only an invalid user fails the call.
    pub fn generate_recommendations_at(
        &self,
        db: &Database,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<GenerationReport> {
        if user.is_nil() {
            return Err(DiscoveryError::Validation("user id is required".into()));
        }

        let ctx = StrategyContext {
            user,
            now,
            db,
            progress: self.progress.as_ref(),
            skills: &self.skills,
            config: &self.config,
        };
        let report = run_all(&self.strategies, &ctx);

        let failed = report.failed().count();
        if failed > 0 {
            warn!(user = %user, failed, written = report.total_written(), "recommendations partially generated");
        } else {
            info!(user = %user, written = report.total_written(), "recommendations generated");
        }
        Ok(report)
    }

    pub fn purge_expired(&self, db: &Database, now: DateTime<Utc>) -> Result<usize> {
        let purged = db.purge_expired_recommendations(now)?;
        if purged > 0 {
            info!(purged, "expired recommendations purged");
        }
        Ok(purged)
    }

    // ------------------------------------------------------------------
    // Trending
    // ------------------------------------------------------------------

    /// Recompute velocity for the whole catalog and swap the snapshot.
    ///
    /// Any provider failure aborts before the store is touched, so readers
    /// keep the previous snapshot.  Returns the number of ranked courses.
    pub fn refresh_trending(&self, db: &mut Database, now: DateTime<Utc>) -> Result<usize> {
        let since = lookback_start(now);
        let mut samples = Vec::new();
        for course in self.progress.catalog()? {
            let stamps = self.progress.enrollment_timestamps(course.id, since)?;
            let counts = window_counts(&stamps, now);
            samples.push((course, counts));
        }

        let snapshot = build_snapshot(samples, now);
        db.replace_trending(&snapshot)?;
        Ok(snapshot.len())
    }

    pub fn trending(&self, db: &Database, limit: Option<u32>) -> Result<Vec<TrendingEntry>> {
        Ok(db.top_trending(limit.unwrap_or(DEFAULT_TRENDING_LIMIT))?)
    }

    // ------------------------------------------------------------------
    // Achievements and profile
    // ------------------------------------------------------------------

    pub fn evaluate_achievements(&self, db: &mut Database, user: UserId) -> Result<EvaluationOutcome> {
        if user.is_nil() {
            return Err(DiscoveryError::Validation("user id is required".into()));
        }
        evaluator::evaluate(db, self.progress.as_ref(), &self.achievements, user, Utc::now())
    }

    pub fn unlocked_achievements(&self, db: &Database, user: UserId) -> Result<Vec<UnlockedAchievement>> {
        Ok(db.unlocked_achievements(user)?)
    }

    pub fn achievement(&self, id: &str) -> Result<&AchievementDefinition> {
        self.achievements
            .get(id)
            .ok_or_else(|| DiscoveryError::NotFound(format!("achievement {id}")))
    }

    pub fn achievement_catalog(&self) -> &AchievementCatalog {
        &self.achievements
    }

    pub fn profile(&self, db: &Database, user: UserId) -> Result<Profile> {
        let archetype = self.identity.archetype(user)?.map(|a| a.name);

        let mut completed_courses: Vec<_> =
            self.progress.completed_courses(user)?.into_iter().collect();
        completed_courses.sort();

        let achievements = db
            .unlocked_achievements(user)?
            .into_iter()
            .map(|unlock| {
                let definition = self.achievements.get(&unlock.achievement_id);
                ProfileAchievement {
                    name: definition
                        .map(|d| d.name.clone())
                        .unwrap_or_else(|| unlock.achievement_id.clone()),
                    rarity: definition.map(|d| d.rarity),
                    id: unlock.achievement_id,
                    unlocked_at: unlock.unlocked_at,
                }
            })
            .collect();

        Ok(Profile {
            user_id: user,
            archetype,
            achievements,
            completed_courses,
            followers: db.follower_count(user)?,
            following: db.following_count(user)?,
            recent_activity: db.public_activity(user, PROFILE_ACTIVITY_LIMIT)?,
        })
    }
}
