//! Knowledge graph domain module
//!
//! The planning graph connects four kinds of entities:
//!
//! - **Plan**: a plan document and the unit of extraction
//! - **Agent**: one assignable task inside a plan, with a lifecycle status
//! - **Feature**: a feature a plan describes
//! - **File**: a source file agents modify (derived from agent records)
//!
//! Edges are typed (`CONTAINS`, `DEPENDS_ON`, `MODIFIES`, `BLOCKS`,
//! `SIMILAR_TO`) and carry a confidence: 1.0 when derived directly from
//! document structure, below 1.0 when inferred.
//!
//! Identity across reindex runs is the canonical id (`plan:007`,
//! `agent:007#002`, `feature:007#auth`, `file:src/lib.rs`); the surrogate
//! store id exists only to key relationships.

mod entity;
mod relationship;
mod store;

pub use entity::{
    Entity, EntityType, Metadata, agent_canonical_id, feature_canonical_id, file_canonical_id,
    plan_canonical_id,
};
pub use relationship::{RelationType, Relationship};
pub use store::{
    BatchOutcome, EntityDraft, GraphStore, LocalEntity, LocalRelationship, RelationshipDraft,
};
