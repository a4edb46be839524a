use pathwise_shared::constants::MAX_MATCH_SCORE;
use pathwise_shared::Strategy;
use pathwise_store::Metadata;

use super::{Candidate, RecommendationStrategy, StrategyContext};
use crate::error::Result;

/// Surface the current trending snapshot to everyone.  Reads only the cached
/// snapshot; it does not recompute velocity.
pub struct TrendingBoost;

impl RecommendationStrategy for TrendingBoost {
    fn strategy(&self) -> Strategy {
        Strategy::Trending
    }

    fn candidates(&self, ctx: &StrategyContext<'_>) -> Result<Vec<Candidate>> {
        let entries = ctx.db.top_trending(ctx.config.trending_cap)?;

        Ok(entries
            .into_iter()
            .map(|entry| {
                let mut metadata = Metadata::new();
                metadata.insert("velocity".into(), entry.velocity.into());
                metadata.insert("rank".into(), entry.rank.into());
                metadata.insert("signups_24h".into(), entry.signups_24h.into());
                Candidate {
                    item_id: entry.item_id,
                    score: velocity_score(entry.velocity, ctx.config.trending_score_multiplier),
                    reason: format!("Trending now: {:.1}x signup velocity", entry.velocity),
                    metadata,
                }
            })
            .collect())
    }
}

fn velocity_score(velocity: f64, multiplier: f64) -> u8 {
    let scaled = (velocity * multiplier).round();
    if scaled.is_nan() || scaled <= 0.0 {
        0
    } else {
        scaled.min(f64::from(MAX_MATCH_SCORE)) as u8
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use pathwise_shared::{CourseId, UserId};
    use pathwise_store::TrendingEntry;

    use crate::config::DiscoveryConfig;
    use crate::skill_graph::SkillGraph;
    use crate::strategies::{RecommendationStrategy, StrategyContext};
    use crate::test_support::{temp_db, FakeProgress};

    use super::{velocity_score, TrendingBoost};

    #[test]
    fn score_is_capped() {
        assert_eq!(velocity_score(10.0, 10.0), 100);
        assert_eq!(velocity_score(2.54, 10.0), 25);
        assert_eq!(velocity_score(0.0, 10.0), 0);
        assert_eq!(velocity_score(f64::INFINITY, 10.0), 100);
    }

    #[test]
    fn reads_snapshot_in_rank_order() {
        let (mut db, _dir) = temp_db();
        let now = Utc::now();
        let (hot, warm) = (CourseId::new(), CourseId::new());
        db.replace_trending(&[
            TrendingEntry {
                item_id: hot,
                velocity: 10.0,
                signups_24h: 12,
                signups_previous_24h: 0,
                rank: 1,
                category: "web".into(),
                calculated_at: now,
            },
            TrendingEntry {
                item_id: warm,
                velocity: 1.5,
                signups_24h: 3,
                signups_previous_24h: 2,
                rank: 2,
                category: "data".into(),
                calculated_at: now,
            },
        ])
        .unwrap();

        let progress = FakeProgress::default();
        let config = DiscoveryConfig::default();
        let skills = SkillGraph::default();
        let ctx = StrategyContext {
            user: UserId::new(),
            now,
            db: &db,
            progress: &progress,
            skills: &skills,
            config: &config,
        };

        let candidates = TrendingBoost.candidates(&ctx).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].item_id, hot);
        assert_eq!(candidates[0].score, 100);
        assert_eq!(candidates[0].reason, "Trending now: 10.0x signup velocity");
        assert_eq!(candidates[1].score, 15);
        assert_eq!(candidates[1].metadata["rank"], 2);
    }
}
