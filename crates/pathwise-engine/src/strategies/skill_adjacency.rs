use std::collections::{BTreeMap, BTreeSet, HashSet};

use pathwise_shared::Strategy;
use pathwise_store::Metadata;

use super::{Candidate, RecommendationStrategy, StrategyContext};
use crate::error::Result;

/// Recommend courses teaching the skills that logically follow the ones the
/// user already has, one hop along the skill graph.
pub struct SkillAdjacency;

/// Best band reached by an adjacent skill, and from where.
struct Adjacent {
    band: usize,
    from: String,
    supporters: usize,
}

impl RecommendationStrategy for SkillAdjacency {
    fn strategy(&self) -> Strategy {
        Strategy::SkillAdjacency
    }

    fn candidates(&self, ctx: &StrategyContext<'_>) -> Result<Vec<Candidate>> {
        let completed = ctx.progress.completed_courses(ctx.user)?;
        let started = ctx.progress.started_courses(ctx.user)?;

        let mut known = BTreeSet::new();
        for course in &completed {
            known.extend(ctx.progress.course_skills(*course)?);
        }

        let mut adjacent: BTreeMap<&str, Adjacent> = BTreeMap::new();
        for from in &known {
            for (position, next) in ctx.skills.next_skills(from).iter().enumerate() {
                if known.contains(next) {
                    continue;
                }
                let band = position.min(2);
                adjacent
                    .entry(next.as_str())
                    .and_modify(|a| {
                        a.supporters += 1;
                        if band < a.band {
                            a.band = band;
                            a.from = from.clone();
                        }
                    })
                    .or_insert_with(|| Adjacent {
                        band,
                        from: from.clone(),
                        supporters: 1,
                    });
            }
        }

        let mut ranked: Vec<_> = adjacent.into_iter().collect();
        // BTreeMap order already sorts by name; stable sort keeps it as the last key.
        ranked.sort_by(|(_, a), (_, b)| a.band.cmp(&b.band).then(b.supporters.cmp(&a.supporters)));

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        'skills: for (skill, adj) in ranked {
            let mut courses = ctx.progress.courses_for_skill(skill)?;
            courses.sort();
            for course in courses {
                if started.contains(&course) || completed.contains(&course) || !seen.insert(course)
                {
                    continue;
                }
                let mut metadata = Metadata::new();
                metadata.insert("skill".into(), skill.into());
                metadata.insert("from_skill".into(), adj.from.as_str().into());

                candidates.push(Candidate {
                    item_id: course,
                    score: ctx.config.skill_bands[adj.band],
                    reason: reason(adj.band, &adj.from),
                    metadata,
                });
                if candidates.len() >= ctx.config.skill_cap {
                    break 'skills;
                }
            }
        }
        Ok(candidates)
    }
}

fn reason(band: usize, from: &str) -> String {
    match band {
        0 => format!("Next skill after {from}"),
        1 => format!("Builds on your {from} fundamentals"),
        _ => format!("Advanced technique related to {from}"),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use pathwise_shared::UserId;

    use crate::config::DiscoveryConfig;
    use crate::skill_graph::SkillGraph;
    use crate::strategies::{RecommendationStrategy, StrategyContext};
    use crate::test_support::{temp_db, FakeProgress};

    use super::SkillAdjacency;

    fn graph() -> SkillGraph {
        SkillGraph::from_edges([
            ("rust", vec!["ownership", "async-rust", "unsafe-rust", "macros"]),
            ("ownership", vec!["lifetimes"]),
        ])
    }

    #[test]
    fn scores_follow_successor_position() {
        let (db, _dir) = temp_db();
        let mut progress = FakeProgress::default();
        let me = UserId::new();
        let intro = progress.add_course("systems", &["rust"]);
        progress.complete(me, intro);
        let ownership = progress.add_course("systems", &["ownership"]);
        let asynchronous = progress.add_course("systems", &["async-rust"]);
        let macros = progress.add_course("systems", &["macros"]);

        let config = DiscoveryConfig::default();
        let skills = graph();
        let ctx = StrategyContext {
            user: me,
            now: Utc::now(),
            db: &db,
            progress: &progress,
            skills: &skills,
            config: &config,
        };

        let candidates = SkillAdjacency.candidates(&ctx).unwrap();
        let summary: Vec<_> = candidates
            .iter()
            .map(|c| (c.item_id, c.score, c.reason.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (ownership, 88, "Next skill after rust"),
                (asynchronous, 85, "Builds on your rust fundamentals"),
                (macros, 82, "Advanced technique related to rust"),
            ]
        );
        assert_eq!(candidates[0].metadata["skill"], "ownership");
        assert_eq!(candidates[0].metadata["from_skill"], "rust");
    }

    #[test]
    fn skips_known_skills_and_started_courses() {
        let (db, _dir) = temp_db();
        let mut progress = FakeProgress::default();
        let me = UserId::new();
        let intro = progress.add_course("systems", &["rust"]);
        let borrowck = progress.add_course("systems", &["ownership"]);
        progress.complete(me, intro);
        progress.complete(me, borrowck);
        let lifetimes = progress.add_course("systems", &["lifetimes"]);
        let tokio = progress.add_course("systems", &["async-rust"]);
        progress.start(me, tokio);

        let config = DiscoveryConfig::default();
        let skills = graph();
        let ctx = StrategyContext {
            user: me,
            now: Utc::now(),
            db: &db,
            progress: &progress,
            skills: &skills,
            config: &config,
        };

        let candidates = SkillAdjacency.candidates(&ctx).unwrap();
        let ids: Vec<_> = candidates.iter().map(|c| c.item_id).collect();
        assert_eq!(ids, vec![lifetimes]);
        assert_eq!(candidates[0].score, 88);
        assert_eq!(candidates[0].metadata["from_skill"], "ownership");
    }

    #[test]
    fn skill_lookup_failure_surfaces() {
        let (db, _dir) = temp_db();
        let mut progress = FakeProgress::default();
        let me = UserId::new();
        let intro = progress.add_course("systems", &["rust"]);
        progress.complete(me, intro);
        progress.skills_down = true;

        let config = DiscoveryConfig::default();
        let skills = graph();
        let ctx = StrategyContext {
            user: me,
            now: Utc::now(),
            db: &db,
            progress: &progress,
            skills: &skills,
            config: &config,
        };
        assert!(SkillAdjacency.candidates(&ctx).is_err());
    }
}
