//! Declarative achievement definitions.
//!
//! A definition's criteria is data, not code: a small tree of thresholds
//! over [`BehaviorStats`] that can be loaded from JSON as easily as built in.

use std::path::Path;

use serde::{Deserialize, Serialize};

use pathwise_shared::Rarity;

use crate::providers::BehaviorStats;

/// Predicate over a behavioral snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Criterion {
    CoursesCompleted { at_least: u32 },
    ModulesCompleted { at_least: u32 },
    ExercisesSolved { at_least: u32 },
    PerfectScores { at_least: u32 },
    AverageReviewScore { at_least: f64 },
    ConsecutiveDays { at_least: u32 },
    TotalHours { at_least: f64 },
    AllOf { criteria: Vec<Criterion> },
}

impl Criterion {
    pub fn is_met(&self, stats: &BehaviorStats) -> bool {
        match self {
            Criterion::CoursesCompleted { at_least } => stats.courses_completed >= *at_least,
            Criterion::ModulesCompleted { at_least } => stats.modules_completed >= *at_least,
            Criterion::ExercisesSolved { at_least } => stats.exercises_solved >= *at_least,
            Criterion::PerfectScores { at_least } => stats.perfect_scores >= *at_least,
            Criterion::AverageReviewScore { at_least } => stats.average_review_score >= *at_least,
            Criterion::ConsecutiveDays { at_least } => stats.consecutive_days >= *at_least,
            Criterion::TotalHours { at_least } => stats.total_hours >= *at_least,
            Criterion::AllOf { criteria } => criteria.iter().all(|c| c.is_met(stats)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub rarity: Rarity,
    pub criteria: Criterion,
}

impl AchievementDefinition {
    fn new(id: &str, name: &str, description: &str, rarity: Rarity, criteria: Criterion) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            rarity,
            criteria,
        }
    }
}

/// The static set of achievements a user can earn, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AchievementCatalog {
    definitions: Vec<AchievementDefinition>,
}

impl AchievementCatalog {
    pub fn new(definitions: Vec<AchievementDefinition>) -> Self {
        Self { definitions }
    }

    pub fn builtin() -> Self {
        use Criterion::*;
        use Rarity::*;

        Self::new(vec![
            AchievementDefinition::new(
                "first_steps",
                "First Steps",
                "Complete your first course",
                Common,
                CoursesCompleted { at_least: 1 },
            ),
            AchievementDefinition::new(
                "course_collector",
                "Course Collector",
                "Complete five courses",
                Rare,
                CoursesCompleted { at_least: 5 },
            ),
            AchievementDefinition::new(
                "curriculum_conqueror",
                "Curriculum Conqueror",
                "Complete twenty courses",
                Legendary,
                CoursesCompleted { at_least: 20 },
            ),
            AchievementDefinition::new(
                "module_marathon",
                "Module Marathon",
                "Complete fifty modules",
                Rare,
                ModulesCompleted { at_least: 50 },
            ),
            AchievementDefinition::new(
                "problem_solver",
                "Problem Solver",
                "Solve one hundred exercises",
                Rare,
                ExercisesSolved { at_least: 100 },
            ),
            AchievementDefinition::new(
                "flawless",
                "Flawless",
                "Earn ten perfect exercise scores",
                Epic,
                PerfectScores { at_least: 10 },
            ),
            AchievementDefinition::new(
                "code_critic",
                "Code Critic",
                "Average 90 or better in code review across ten solved exercises",
                Epic,
                AllOf {
                    criteria: vec![
                        ExercisesSolved { at_least: 10 },
                        AverageReviewScore { at_least: 90.0 },
                    ],
                },
            ),
            AchievementDefinition::new(
                "week_streak",
                "Week Streak",
                "Learn seven days in a row",
                Common,
                ConsecutiveDays { at_least: 7 },
            ),
            AchievementDefinition::new(
                "unstoppable",
                "Unstoppable",
                "Learn thirty days in a row",
                Legendary,
                ConsecutiveDays { at_least: 30 },
            ),
            AchievementDefinition::new(
                "centurion",
                "Centurion",
                "Spend one hundred hours learning",
                Epic,
                TotalHours { at_least: 100.0 },
            ),
        ])
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read a catalog from a JSON file (an array of definitions).
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    pub fn get(&self, id: &str) -> Option<&AchievementDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    pub fn definitions(&self) -> &[AchievementDefinition] {
        &self.definitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_ids_are_unique() {
        let catalog = AchievementCatalog::builtin();
        let mut ids: Vec<_> = catalog.definitions().iter().map(|d| &d.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), catalog.definitions().len());
        assert_eq!(catalog.get("first_steps").unwrap().rarity, Rarity::Common);
        assert!(catalog.get("nope").is_none());
    }

    #[test]
    fn all_of_needs_every_clause() {
        let critic = AchievementCatalog::builtin().get("code_critic").unwrap().clone();
        let mut stats = BehaviorStats {
            exercises_solved: 12,
            average_review_score: 85.0,
            ..Default::default()
        };
        assert!(!critic.criteria.is_met(&stats));
        stats.average_review_score = 92.5;
        assert!(critic.criteria.is_met(&stats));
        stats.exercises_solved = 9;
        assert!(!critic.criteria.is_met(&stats));
    }

    #[test]
    fn criteria_load_from_json() {
        let catalog = AchievementCatalog::from_json(
            r#"[{
                "id": "night_owl",
                "name": "Night Owl",
                "description": "Ten hours logged",
                "rarity": "rare",
                "criteria": {"kind": "total_hours", "at_least": 10.0}
            }]"#,
        )
        .unwrap();
        let owl = catalog.get("night_owl").unwrap();
        assert!(owl.criteria.is_met(&BehaviorStats {
            total_hours: 10.0,
            ..Default::default()
        }));
        assert!(!owl.criteria.is_met(&BehaviorStats::default()));
    }

    #[test]
    fn load_reads_catalog_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("achievements.json");
        std::fs::write(
            &path,
            r#"[{"id": "regular", "name": "Regular", "description": "Three days",
                 "rarity": "common",
                 "criteria": {"kind": "consecutive_days", "at_least": 3}}]"#,
        )
        .unwrap();

        let catalog = AchievementCatalog::load(&path).unwrap();
        assert_eq!(catalog.definitions().len(), 1);
        assert_eq!(catalog.get("regular").unwrap().name, "Regular");

        std::fs::write(&path, "{not json").unwrap();
        let err = AchievementCatalog::load(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
