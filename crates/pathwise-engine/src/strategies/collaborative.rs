use std::collections::HashSet;

use pathwise_shared::{CourseId, Strategy, UserId};
use pathwise_store::Metadata;

use super::{Candidate, RecommendationStrategy, StrategyContext};
use crate::config::descending_score;
use crate::error::Result;

const REASON: &str = "Users with similar progress completed this";

/// Recommend what learners with a near-identical completion history finished.
///
/// A peer is similar when they completed at least
/// `similarity_threshold_percent` of the target's completed courses; the
/// ratio is taken against the target's count, so a peer with a much larger
/// history still qualifies.
pub struct CollaborativeFiltering;

struct Peer {
    completed: HashSet<CourseId>,
    overlap_percent: u32,
}

impl RecommendationStrategy for CollaborativeFiltering {
    fn strategy(&self) -> Strategy {
        Strategy::CollaborativeFiltering
    }

    fn candidates(&self, ctx: &StrategyContext<'_>) -> Result<Vec<Candidate>> {
        let target = ctx.progress.completed_courses(ctx.user)?;
        if target.is_empty() {
            return Ok(Vec::new());
        }
        let started = ctx.progress.started_courses(ctx.user)?;

        let mut peers = similar_peers(ctx, &target)?;
        // Stable: equal overlaps keep discovery order.
        peers.sort_by(|a, b| b.overlap_percent.cmp(&a.overlap_percent));

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        'peers: for peer in &peers {
            let mut theirs: Vec<_> = peer
                .completed
                .iter()
                .filter(|c| !started.contains(c) && !target.contains(c))
                .copied()
                .collect();
            theirs.sort();

            for course in theirs {
                if !seen.insert(course) {
                    continue;
                }
                let mut metadata = Metadata::new();
                metadata.insert("peer_overlap_percent".into(), peer.overlap_percent.into());
                metadata.insert("similar_users".into(), peers.len().into());

                candidates.push(Candidate {
                    item_id: course,
                    score: descending_score(
                        ctx.config.collaborative_base_score,
                        candidates.len(),
                    ),
                    reason: REASON.to_string(),
                    metadata,
                });
                if candidates.len() >= ctx.config.collaborative_cap {
                    break 'peers;
                }
            }
        }
        Ok(candidates)
    }
}

/// Peers reached through the target's completed courses that pass the
/// overlap threshold, in discovery order.
fn similar_peers(ctx: &StrategyContext<'_>, target: &HashSet<CourseId>) -> Result<Vec<Peer>> {
    let mut ordered_target: Vec<_> = target.iter().copied().collect();
    ordered_target.sort();

    let mut visited: HashSet<UserId> = HashSet::from([ctx.user]);
    let mut peers = Vec::new();

    for course in ordered_target {
        for learner in ctx.progress.learners_who_completed(course)? {
            if !visited.insert(learner) {
                continue;
            }
            let completed = ctx.progress.completed_courses(learner)?;
            let shared = target.intersection(&completed).count() as u32;
            let overlap_percent = shared * 100 / target.len() as u32;

            if shared * 100 >= ctx.config.similarity_threshold_percent * target.len() as u32 {
                peers.push(Peer {
                    completed,
                    overlap_percent,
                });
            }
        }
    }
    Ok(peers)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use pathwise_shared::{Strategy, UserId};

    use crate::config::DiscoveryConfig;
    use crate::skill_graph::SkillGraph;
    use crate::strategies::{run_all, RecommendationStrategy, StrategyContext};
    use crate::test_support::{temp_db, FakeProgress};

    use super::CollaborativeFiltering;

    #[test]
    fn recommends_from_similar_peers_only() {
        let (db, _dir) = temp_db();
        let mut progress = FakeProgress::default();
        let shared: Vec<_> = (0..5).map(|_| progress.add_course("core", &[])).collect();
        let bonus = progress.add_course("extra", &[]);
        let stranger_pick = progress.add_course("extra", &[]);
        let in_progress = progress.add_course("extra", &[]);

        let (me, twin, stranger) = (UserId::new(), UserId::new(), UserId::new());
        for c in &shared {
            progress.complete(me, *c);
        }
        progress.start(me, in_progress);

        // 4/5 = 80% overlap: similar.
        for c in &shared[..4] {
            progress.complete(twin, *c);
        }
        progress.complete(twin, bonus);
        progress.complete(twin, in_progress);

        // 3/5 = 60%: not similar.
        for c in &shared[..3] {
            progress.complete(stranger, *c);
        }
        progress.complete(stranger, stranger_pick);

        let config = DiscoveryConfig::default();
        let skills = SkillGraph::default();
        let ctx = StrategyContext {
            user: me,
            now: Utc::now(),
            db: &db,
            progress: &progress,
            skills: &skills,
            config: &config,
        };

        let candidates = CollaborativeFiltering.candidates(&ctx).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].item_id, bonus);
        assert_eq!(candidates[0].score, 90);
        assert_eq!(candidates[0].reason, "Users with similar progress completed this");
    }

    #[test]
    fn capped_at_twenty_with_descending_scores() {
        let (db, _dir) = temp_db();
        let mut progress = FakeProgress::default();
        let (me, peer) = (UserId::new(), UserId::new());
        let core = progress.add_course("core", &[]);
        progress.complete(me, core);
        progress.complete(peer, core);
        for _ in 0..25 {
            let c = progress.add_course("extra", &[]);
            progress.complete(peer, c);
        }

        let config = DiscoveryConfig::default();
        let skills = SkillGraph::default();
        let ctx = StrategyContext {
            user: me,
            now: Utc::now(),
            db: &db,
            progress: &progress,
            skills: &skills,
            config: &config,
        };

        let candidates = CollaborativeFiltering.candidates(&ctx).unwrap();
        assert_eq!(candidates.len(), 20);
        let scores: Vec<_> = candidates.iter().map(|c| c.score).collect();
        assert_eq!(scores[0], 90);
        assert_eq!(scores[19], 71);
        assert!(scores.windows(2).all(|w| w[0] == w[1] + 1));
    }

    #[test]
    fn running_twice_does_not_duplicate_rows() {
        let (db, _dir) = temp_db();
        let mut progress = FakeProgress::default();
        let (me, peer) = (UserId::new(), UserId::new());
        let core = progress.add_course("core", &[]);
        progress.complete(me, core);
        progress.complete(peer, core);
        for _ in 0..4 {
            let c = progress.add_course("extra", &[]);
            progress.complete(peer, c);
        }

        let config = DiscoveryConfig::default();
        let skills = SkillGraph::default();
        let strategies: Vec<Box<dyn RecommendationStrategy>> = vec![Box::new(CollaborativeFiltering)];

        for _ in 0..2 {
            let ctx = StrategyContext {
                user: me,
                now: Utc::now(),
                db: &db,
                progress: &progress,
                skills: &skills,
                config: &config,
            };
            run_all(&strategies, &ctx);
        }

        let live = db
            .live_recommendations(me, Some(Strategy::CollaborativeFiltering), Utc::now())
            .unwrap();
        assert_eq!(live.len(), 4);
    }

    #[test]
    fn no_history_no_candidates() {
        let (db, _dir) = temp_db();
        let progress = FakeProgress::default();
        let config = DiscoveryConfig::default();
        let skills = SkillGraph::default();
        let ctx = StrategyContext {
            user: UserId::new(),
            now: Utc::now(),
            db: &db,
            progress: &progress,
            skills: &skills,
            config: &config,
        };
        assert!(CollaborativeFiltering.candidates(&ctx).unwrap().is_empty());
    }
}
