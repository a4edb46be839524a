use std::collections::HashMap;

use pathwise_shared::{CourseId, Strategy};
use pathwise_store::Metadata;

use super::{Candidate, RecommendationStrategy, StrategyContext};
use crate::config::descending_score;
use crate::error::Result;

const REASON: &str = "Friends are learning this";

/// Recommend what the people a user follows have completed.  Silent until
/// the user follows enough accounts for the signal to mean something.
pub struct SocialSignal;

impl RecommendationStrategy for SocialSignal {
    fn strategy(&self) -> Strategy {
        Strategy::SocialSignal
    }

    fn candidates(&self, ctx: &StrategyContext<'_>) -> Result<Vec<Candidate>> {
        let following = ctx.db.following(ctx.user)?;
        if following.len() < ctx.config.social_min_following {
            return Ok(Vec::new());
        }
        let completed = ctx.progress.completed_courses(ctx.user)?;

        // Discovery order is kept alongside the counts so ties stay deterministic.
        let mut order: Vec<CourseId> = Vec::new();
        let mut friends: HashMap<CourseId, usize> = HashMap::new();
        for friend in &following {
            let mut theirs: Vec<_> = ctx
                .progress
                .completed_courses(*friend)?
                .into_iter()
                .filter(|c| !completed.contains(c))
                .collect();
            theirs.sort();
            for course in theirs {
                let count = friends.entry(course).or_insert(0);
                if *count == 0 {
                    order.push(course);
                }
                *count += 1;
            }
        }

        order.sort_by(|a, b| friends[b].cmp(&friends[a]));

        Ok(order
            .into_iter()
            .take(ctx.config.social_cap)
            .enumerate()
            .map(|(idx, course)| {
                let mut metadata = Metadata::new();
                metadata.insert("friends_completed".into(), friends[&course].into());
                Candidate {
                    item_id: course,
                    score: descending_score(ctx.config.social_base_score, idx),
                    reason: REASON.to_string(),
                    metadata,
                }
            })
            .collect())
    }
}
