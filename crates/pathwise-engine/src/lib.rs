//! # pathwise-engine
//!
//! The discovery and engagement engine: recommendation strategies, the
//! trending velocity calculation, the achievement evaluator and the
//! [`DiscoveryEngine`] facade that ties them to the store.
//!
//! Course progress and identity data come from other domains through the
//! capability traits in [`providers`]; the engine never writes them.

pub mod achievements;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod providers;
pub mod skill_graph;
pub mod strategies;
pub mod velocity;

#[cfg(test)]
mod test_support;

pub use achievements::{AchievementCatalog, AchievementDefinition, Criterion};
pub use config::DiscoveryConfig;
pub use engine::{
    DiscoveryEngine, Profile, ProfileAchievement, RecommendationSection, StrategyFilter,
};
pub use error::{DiscoveryError, ProviderError, Result};
pub use evaluator::{EvaluationOutcome, UnlockFailure};
pub use providers::{Archetype, BehaviorStats, CourseInfo, CourseProgress, IdentityProvider};
pub use skill_graph::SkillGraph;
pub use strategies::{GenerationReport, OutcomeStatus, StrategyOutcome};
