//! Tuning knobs for the recommendation strategies.
//!
//! Everything the strategies treat as a threshold, cap, score band or expiry
//! window lives here and is handed to the engine at construction.

use chrono::Duration;

use pathwise_shared::Strategy;

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Minimum share of the target's completed courses a peer must also have
    /// completed, in percent.
    pub similarity_threshold_percent: u32,
    pub collaborative_cap: usize,
    pub collaborative_base_score: u8,
    pub collaborative_ttl: Duration,

    pub skill_cap: usize,
    /// Scores for next skill / building on fundamentals / advanced technique.
    pub skill_bands: [u8; 3],
    pub skill_ttl: Duration,

    /// Followed accounts required before the social strategy produces anything.
    pub social_min_following: usize,
    pub social_cap: usize,
    pub social_base_score: u8,
    pub social_ttl: Duration,

    pub trending_cap: u32,
    pub trending_score_multiplier: f64,
    pub trending_ttl: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            similarity_threshold_percent: 80,
            collaborative_cap: 20,
            collaborative_base_score: 90,
            collaborative_ttl: Duration::days(7),

            skill_cap: 10,
            skill_bands: [88, 85, 82],
            skill_ttl: Duration::days(7),

            social_min_following: 3,
            social_cap: 15,
            social_base_score: 85,
            social_ttl: Duration::days(3),

            trending_cap: 10,
            trending_score_multiplier: 10.0,
            trending_ttl: Duration::hours(24),
        }
    }
}

impl DiscoveryConfig {
    /// How long rows written by `strategy` stay live.
    pub fn ttl(&self, strategy: Strategy) -> Duration {
        match strategy {
            Strategy::CollaborativeFiltering => self.collaborative_ttl,
            Strategy::SkillAdjacency => self.skill_ttl,
            Strategy::SocialSignal => self.social_ttl,
            Strategy::Trending => self.trending_ttl,
        }
    }
}

/// `base`, `base - 1`, ... by list position, bottoming out at zero.
pub(crate) fn descending_score(base: u8, position: usize) -> u8 {
    let step = u8::try_from(position).unwrap_or(u8::MAX);
    base.saturating_sub(step)
}
