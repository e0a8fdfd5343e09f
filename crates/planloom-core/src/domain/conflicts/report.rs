//! Conflict report types

use serde::{Deserialize, Serialize};

/// Severity of a conflict finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Must be resolved before the affected work proceeds
    Error,
    /// Worth a look, does not block work
    Warning,
}

impl Severity {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of conflict a detector found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Two or more in-progress agents modify the same file
    FileContention,
    /// Two features look like the same work
    FeatureOverlap,
    /// Agents depend on each other in a cycle
    CircularDependency,
    /// An in-progress agent has not been touched for too long
    StaleWip,
}

impl ConflictType {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileContention => "file_contention",
            Self::FeatureOverlap => "feature_overlap",
            Self::CircularDependency => "circular_dependency",
            Self::StaleWip => "stale_wip",
        }
    }
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One finding from the conflict detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictReport {
    /// Kind of conflict
    pub conflict_type: ConflictType,
    /// How serious it is
    pub severity: Severity,
    /// Canonical ids of the entities involved
    pub affected_entities: Vec<String>,
    /// Human-readable description
    pub message: String,
}
