//! Graph relationships
//!
//! Relationships are the directed, typed edges of the planning graph.
//! Structural relations derived directly from document syntax carry
//! confidence 1.0; inferred relations (similarity) carry less.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::Metadata;

/// A directed, typed edge between two graph entities
///
/// `(source_id, target_id, relation_type)` is unique in the store; a repeat
/// upsert replaces confidence and metadata rather than inserting a second
/// edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    /// Store-assigned surrogate identifier
    pub id: String,
    /// Id of the source entity
    pub source_id: String,
    /// Id of the target entity
    pub target_id: String,
    /// Type of relationship
    pub relation_type: RelationType,
    /// Strength of the relation (0.0 to 1.0); 1.0 for structural relations
    pub confidence: f32,
    /// Open metadata bag
    pub metadata: Metadata,
    /// When the relationship was first inserted
    pub created_at: DateTime<Utc>,
}

/// Types of relationships between planning entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    /// Plan contains an agent or feature
    Contains,
    /// Agent depends on another agent completing first
    DependsOn,
    /// Agent modifies a file
    Modifies,
    /// Source blocks the target from progressing
    Blocks,
    /// Features are similar (inferred, bidirectional in meaning)
    SimilarTo,
}

impl RelationType {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "CONTAINS",
            Self::DependsOn => "DEPENDS_ON",
            Self::Modifies => "MODIFIES",
            Self::Blocks => "BLOCKS",
            Self::SimilarTo => "SIMILAR_TO",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CONTAINS" => Some(Self::Contains),
            "DEPENDS_ON" => Some(Self::DependsOn),
            "MODIFIES" => Some(Self::Modifies),
            "BLOCKS" => Some(Self::Blocks),
            "SIMILAR_TO" => Some(Self::SimilarTo),
            _ => None,
        }
    }

    /// Get all relationship types
    pub fn all() -> &'static [RelationType] {
        &[
            Self::Contains,
            Self::DependsOn,
            Self::Modifies,
            Self::Blocks,
            Self::SimilarTo,
        ]
    }

    /// Whether edges of this type are inferred rather than structural
    pub fn is_inferred(&self) -> bool {
        matches!(self, Self::SimilarTo)
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_type_parsing() {
        assert_eq!(RelationType::parse("CONTAINS"), Some(RelationType::Contains));
        assert_eq!(
            RelationType::parse("depends_on"),
            Some(RelationType::DependsOn)
        );
        assert_eq!(
            RelationType::parse("SIMILAR_TO"),
            Some(RelationType::SimilarTo)
        );
        assert_eq!(RelationType::parse("unknown"), None);
    }

    #[test]
    fn test_relation_type_round_trip() {
        for relation_type in RelationType::all() {
            assert_eq!(
                RelationType::parse(relation_type.as_str()),
                Some(*relation_type)
            );
        }
    }

    #[test]
    fn test_inferred_classification() {
        assert!(RelationType::SimilarTo.is_inferred());
        assert!(!RelationType::Contains.is_inferred());
        assert!(!RelationType::DependsOn.is_inferred());
    }
}
