//! Static skill progression graph: skill -> logically next skills.
//!
//! Built once at startup (from the built-in curriculum or a JSON file) and
//! shared read-only.  The order of a skill's successors matters: the first is
//! the primary next step, later ones are progressively further afield.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SkillGraph {
    edges: HashMap<String, Vec<String>>,
}

impl SkillGraph {
    pub fn from_edges<I, S, N>(edges: I) -> Self
    where
        I: IntoIterator<Item = (S, N)>,
        S: Into<String>,
        N: IntoIterator,
        N::Item: Into<String>,
    {
        Self {
            edges: edges
                .into_iter()
                .map(|(skill, next)| (skill.into(), next.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }

    /// Parse `{"skill": ["next", ...], ...}`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// The curriculum shipped with the platform.
    pub fn builtin() -> Self {
        Self::from_edges([
            ("programming-basics", vec!["data-structures", "version-control", "testing"]),
            ("data-structures", vec!["algorithms", "complexity-analysis", "databases"]),
            ("algorithms", vec!["dynamic-programming", "graph-algorithms", "optimization"]),
            ("version-control", vec!["code-review", "ci-cd"]),
            ("testing", vec!["test-driven-development", "property-testing", "ci-cd"]),
            ("rust", vec!["ownership", "async-rust", "unsafe-rust"]),
            ("ownership", vec!["lifetimes", "smart-pointers", "concurrency"]),
            ("async-rust", vec!["networking", "concurrency", "distributed-systems"]),
            ("python", vec!["data-analysis", "web-backends", "machine-learning"]),
            ("javascript", vec!["typescript", "web-frontends", "web-backends"]),
            ("web-backends", vec!["databases", "api-design", "distributed-systems"]),
            ("databases", vec!["query-optimization", "data-modeling", "distributed-systems"]),
            ("concurrency", vec!["lock-free-programming", "distributed-systems"]),
            ("networking", vec!["protocol-design", "distributed-systems"]),
            ("code-review", vec!["software-architecture"]),
        ])
    }

    /// Successors of `skill`, primary first.  Unknown skills have none.
    pub fn next_skills(&self, skill: &str) -> &[String] {
        self.edges.get(skill).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
