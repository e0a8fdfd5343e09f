//! Graph entity types
//!
//! Entities are the nodes of the planning knowledge graph: plans, the agent
//! tasks inside them, the features they describe, and the files they touch.
//! Identity across repeated reindexing is the canonical id, never the
//! store-assigned surrogate id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Open key/value bag attached to entities and relationships
pub type Metadata = serde_json::Map<String, Value>;

/// A node in the planning knowledge graph
///
/// The surrogate `id` is assigned by the store on first insert and stays
/// stable for the lifetime of the row. The `canonical_id` is the
/// human-derivable key (`plan:007`, `agent:007#002`, ...) that upserts match
/// on across reindex runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Store-assigned surrogate identifier
    pub id: String,
    /// Type of entity
    pub entity_type: EntityType,
    /// Deterministic identity key, unique per entity
    pub canonical_id: String,
    /// Human-readable display label
    pub name: String,
    /// Originating document path (absent for derived entities such as files)
    pub source_path: Option<String>,
    /// Open metadata bag (e.g. `status`, `persona`)
    pub metadata: Metadata,
    /// When the entity was first inserted
    pub created_at: DateTime<Utc>,
    /// When the entity was last upserted
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    /// Read a string-valued metadata field
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// Agent lifecycle status, if this entity carries one
    pub fn status(&self) -> Option<&str> {
        self.metadata_str("status")
    }
}

/// Canonical id for a plan entity
pub fn plan_canonical_id(plan_id: &str) -> String {
    format!("plan:{plan_id}")
}

/// Canonical id for an agent entity; ordinals are zero-padded to three digits
pub fn agent_canonical_id(plan_id: &str, ordinal: u32) -> String {
    format!("agent:{plan_id}#{ordinal:03}")
}

/// Canonical id for a feature entity
pub fn feature_canonical_id(plan_id: &str, feature_id: &str) -> String {
    format!("feature:{plan_id}#{feature_id}")
}

/// Canonical id for a file entity, keyed by repository-relative path
pub fn file_canonical_id(relative_path: &str) -> String {
    format!("file:{relative_path}")
}

/// Types of graph entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// A plan document containing one or more agent tasks
    Plan,
    /// One assignable unit of work within a plan
    Agent,
    /// A feature described by a plan
    Feature,
    /// A source file touched by one or more agents (derived)
    File,
}

impl EntityType {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Agent => "agent",
            Self::Feature => "feature",
            Self::File => "file",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "plan" => Some(Self::Plan),
            "agent" => Some(Self::Agent),
            "feature" => Some(Self::Feature),
            "file" => Some(Self::File),
            _ => None,
        }
    }

    /// Get all entity types
    pub fn all() -> &'static [EntityType] {
        &[Self::Plan, Self::Agent, Self::Feature, Self::File]
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_id_formats() {
        assert_eq!(plan_canonical_id("007"), "plan:007");
        assert_eq!(agent_canonical_id("007", 2), "agent:007#002");
        assert_eq!(agent_canonical_id("007", 12), "agent:007#012");
        assert_eq!(feature_canonical_id("007", "auth"), "feature:007#auth");
        assert_eq!(file_canonical_id("src/lib.rs"), "file:src/lib.rs");
    }

    #[test]
    fn test_entity_type_parsing() {
        assert_eq!(EntityType::parse("plan"), Some(EntityType::Plan));
        assert_eq!(EntityType::parse("AGENT"), Some(EntityType::Agent));
        assert_eq!(EntityType::parse("unknown"), None);
    }

    #[test]
    fn test_entity_type_round_trip() {
        for entity_type in EntityType::all() {
            assert_eq!(EntityType::parse(entity_type.as_str()), Some(*entity_type));
        }
    }

    #[test]
    fn test_metadata_accessors() {
        let mut metadata = Metadata::new();
        metadata.insert("status".into(), Value::String("WIP".into()));
        metadata.insert("ordinal".into(), Value::from(3));

        let entity = Entity {
            id: "e1".into(),
            entity_type: EntityType::Agent,
            canonical_id: agent_canonical_id("007", 3),
            name: "agent 3".into(),
            source_path: Some("plans/007/agent_003.md".into()),
            metadata,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(entity.status(), Some("WIP"));
        assert_eq!(entity.metadata_str("persona"), None);
    }
}
