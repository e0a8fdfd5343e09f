//! Parsed plan document records
//!
//! Document parsing (frontmatter, markdown) happens in an external
//! collaborator; this core consumes its output as the typed records below.
//! The [`PlanSource`] trait is the seam that collaborator implements.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Lifecycle status of an agent task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Not started
    Gap,
    /// In progress
    Wip,
    /// Done
    Pass,
    /// Blocked on something outside the dependency graph
    Blocked,
}

impl TaskStatus {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gap => "GAP",
            Self::Wip => "WIP",
            Self::Pass => "PASS",
            Self::Blocked => "BLOCKED",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GAP" => Some(Self::Gap),
            "WIP" => Some(Self::Wip),
            "PASS" => Some(Self::Pass),
            "BLOCKED" => Some(Self::Blocked),
            _ => None,
        }
    }

    /// Get all task statuses
    pub fn all() -> &'static [TaskStatus] {
        &[Self::Gap, Self::Wip, Self::Pass, Self::Blocked]
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One agent task record inside a plan document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Ordinal number of the agent within its plan (0-based)
    pub ordinal: u32,
    /// Lifecycle status
    pub status: TaskStatus,
    /// Persona assigned to the agent (e.g. `backend`, `reviewer`)
    #[serde(default)]
    pub persona: Option<String>,
    /// Task ids this agent depends on (`{planId}#{NNN}` or a bare ordinal
    /// within the same plan)
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Repository-relative paths this agent modifies
    #[serde(default)]
    pub files_touched: Vec<String>,
    /// Raw scoring overrides from the agent's frontmatter, parsed lazily
    #[serde(default)]
    pub overrides: Option<Value>,
}

impl AgentRecord {
    /// The task id of this agent within the given plan
    pub fn task_id(&self, plan_id: &str) -> String {
        format!("{plan_id}#{:03}", self.ordinal)
    }
}

/// One feature record inside a plan document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Identifier unique within the plan
    pub feature_id: String,
    /// Feature title
    pub title: String,
    /// Optional longer description
    #[serde(default)]
    pub description: Option<String>,
}

/// A fully parsed plan document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRecord {
    /// Plan identifier (directory name, e.g. `007`)
    pub plan_id: String,
    /// Numeric plan number used for deterministic ordering and tie-breaks
    pub plan_number: u32,
    /// Plan display name
    pub name: String,
    /// Path of the plan directory, when known
    #[serde(default)]
    pub path: Option<String>,
    /// Plan-level status from frontmatter, when present
    #[serde(default)]
    pub status: Option<String>,
    /// Raw scoring overrides from the plan's frontmatter, parsed lazily
    #[serde(default)]
    pub overrides: Option<Value>,
    /// Agent task records
    #[serde(default)]
    pub agents: Vec<AgentRecord>,
    /// Feature records
    #[serde(default)]
    pub features: Vec<FeatureRecord>,
}

impl PlanRecord {
    /// Find an agent by ordinal
    pub fn agent(&self, ordinal: u32) -> Option<&AgentRecord> {
        self.agents.iter().find(|a| a.ordinal == ordinal)
    }
}

/// Source of parsed plan records
///
/// Implemented by the external document-parsing collaborator; this core
/// never reads plan documents itself.
pub trait PlanSource: Send + Sync {
    /// Load all known plan records
    fn load_plans(&self) -> Result<Vec<PlanRecord>>;

    /// Load one plan record by id, if it exists
    fn load_plan(&self, plan_id: &str) -> Result<Option<PlanRecord>> {
        Ok(self
            .load_plans()?
            .into_iter()
            .find(|p| p.plan_id == plan_id))
    }
}

/// In-memory plan source over pre-built records
///
/// Used by tests and by callers that already hold parsed records.
#[derive(Debug, Clone, Default)]
pub struct StaticPlanSource {
    plans: Vec<PlanRecord>,
}

impl StaticPlanSource {
    /// Create a source over the given records
    pub fn new(plans: Vec<PlanRecord>) -> Self {
        Self { plans }
    }
}

impl PlanSource for StaticPlanSource {
    fn load_plans(&self) -> Result<Vec<PlanRecord>> {
        Ok(self.plans.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_status_round_trip() {
        for status in TaskStatus::all() {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(*status));
        }
        assert_eq!(TaskStatus::parse("wip"), Some(TaskStatus::Wip));
        assert_eq!(TaskStatus::parse("unknown"), None);
    }

    #[test]
    fn test_task_id_format() {
        let agent = AgentRecord {
            ordinal: 7,
            status: TaskStatus::Gap,
            persona: None,
            dependencies: vec![],
            files_touched: vec![],
            overrides: None,
        };
        assert_eq!(agent.task_id("012"), "012#007");
    }

    #[test]
    fn test_static_plan_source_lookup() {
        let source = StaticPlanSource::new(vec![PlanRecord {
            plan_id: "007".into(),
            plan_number: 7,
            name: "Plan 007".into(),
            path: None,
            status: None,
            overrides: None,
            agents: vec![],
            features: vec![],
        }]);

        assert!(source.load_plan("007").unwrap().is_some());
        assert!(source.load_plan("008").unwrap().is_none());
    }
}
