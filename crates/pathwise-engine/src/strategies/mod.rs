//! Recommendation strategies and the best-effort runner that drives them.
//!
//! Each strategy only computes candidates; [`run_all`] turns candidates into
//! upserted rows and records one [`StrategyOutcome`] per strategy.  A failing
//! strategy never stops the others, and rows it wrote before failing stay.

mod collaborative;
mod skill_adjacency;
mod social;
mod trending;

pub use collaborative::CollaborativeFiltering;
pub use skill_adjacency::SkillAdjacency;
pub use social::SocialSignal;
pub use trending::TrendingBoost;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use pathwise_shared::{CourseId, Strategy, UserId};
use pathwise_store::{Database, Metadata, Recommendation};

use crate::config::DiscoveryConfig;
use crate::error::Result;
use crate::providers::CourseProgress;
use crate::skill_graph::SkillGraph;

/// Everything a strategy may read while computing candidates.
pub struct StrategyContext<'a> {
    pub user: UserId,
    pub now: DateTime<Utc>,
    pub db: &'a Database,
    pub progress: &'a dyn CourseProgress,
    pub skills: &'a SkillGraph,
    pub config: &'a DiscoveryConfig,
}

/// A course a strategy wants to recommend, before it is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub item_id: CourseId,
    pub score: u8,
    pub reason: String,
    pub metadata: Metadata,
}

pub trait RecommendationStrategy: Send + Sync {
    fn strategy(&self) -> Strategy;

    /// Candidates in presentation order, already capped.
    fn candidates(&self, ctx: &StrategyContext<'_>) -> Result<Vec<Candidate>>;
}

/// The four strategies in their fixed run order.
pub fn default_strategies() -> Vec<Box<dyn RecommendationStrategy>> {
    vec![
        Box::new(CollaborativeFiltering),
        Box::new(SkillAdjacency),
        Box::new(SocialSignal),
        Box::new(TrendingBoost),
    ]
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Completed { written: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyOutcome {
    pub strategy: Strategy,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

/// What one `generate_recommendations` call achieved, strategy by strategy.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub user_id: UserId,
    pub generated_at: DateTime<Utc>,
    pub outcomes: Vec<StrategyOutcome>,
}

impl GenerationReport {
    pub fn total_written(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                OutcomeStatus::Completed { written } => written,
                OutcomeStatus::Failed { .. } => 0,
            })
            .sum()
    }

    pub fn failed(&self) -> impl Iterator<Item = &StrategyOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, OutcomeStatus::Failed { .. }))
    }

    pub fn outcome(&self, strategy: Strategy) -> Option<&OutcomeStatus> {
        self.outcomes
            .iter()
            .find(|o| o.strategy == strategy)
            .map(|o| &o.status)
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

pub(crate) fn run_all(
    strategies: &[Box<dyn RecommendationStrategy>],
    ctx: &StrategyContext<'_>,
) -> GenerationReport {
    let outcomes = strategies
        .iter()
        .map(|strategy| {
            let kind = strategy.strategy();
            let status = match run_one(strategy.as_ref(), ctx) {
                Ok(written) => {
                    debug!(user = %ctx.user, strategy = %kind, written, "strategy completed");
                    OutcomeStatus::Completed { written }
                }
                Err(e) => {
                    warn!(user = %ctx.user, strategy = %kind, error = %e, "strategy failed");
                    OutcomeStatus::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            StrategyOutcome {
                strategy: kind,
                status,
            }
        })
        .collect();

    GenerationReport {
        user_id: ctx.user,
        generated_at: ctx.now,
        outcomes,
    }
}

fn run_one(strategy: &dyn RecommendationStrategy, ctx: &StrategyContext<'_>) -> Result<usize> {
    let kind = strategy.strategy();
    let expires_at = ctx.now + ctx.config.ttl(kind);
    let candidates = strategy.candidates(ctx)?;

    for candidate in &candidates {
        ctx.db.upsert_recommendation(&Recommendation {
            id: Uuid::new_v4(),
            user_id: ctx.user,
            item_id: candidate.item_id,
            strategy: kind,
            match_score: candidate.score,
            reason: candidate.reason.clone(),
            metadata: candidate.metadata.clone(),
            created_at: ctx.now,
            expires_at: Some(expires_at),
        })?;
    }
    Ok(candidates.len())
}
