//! Graph store contract
//!
//! The store owns the entity/relationship tables and their upsert semantics.
//! Everything above it (reindexing, conflict detection, scoring lookups)
//! goes through this trait.

use async_trait::async_trait;

use crate::error::Result;

use super::entity::{Entity, EntityType, Metadata};
use super::relationship::{RelationType, Relationship};

/// Input for an entity upsert, keyed by canonical id
///
/// The store assigns (or finds) the surrogate id; callers never supply one.
#[derive(Debug, Clone)]
pub struct EntityDraft {
    pub entity_type: EntityType,
    pub canonical_id: String,
    pub name: String,
    pub source_path: Option<String>,
    pub metadata: Metadata,
}

/// Input for a relationship upsert between two existing entities
#[derive(Debug, Clone)]
pub struct RelationshipDraft {
    pub source_id: String,
    pub target_id: String,
    pub relation_type: RelationType,
    pub confidence: f32,
    pub metadata: Metadata,
}

/// An entity inside one extraction batch, numbered with a batch-local id
///
/// Local ids start at 1 and are meaningful only within the single batch they
/// came from; they are never shared with the store or another batch.
#[derive(Debug, Clone)]
pub struct LocalEntity {
    pub local_id: u32,
    pub entity_type: EntityType,
    pub canonical_id: String,
    pub name: String,
    pub source_path: Option<String>,
    pub metadata: Metadata,
}

impl LocalEntity {
    /// View this local entity as a store draft
    pub fn to_draft(&self) -> EntityDraft {
        EntityDraft {
            entity_type: self.entity_type,
            canonical_id: self.canonical_id.clone(),
            name: self.name.clone(),
            source_path: self.source_path.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// A relationship inside one extraction batch, endpoints given as local ids
#[derive(Debug, Clone)]
pub struct LocalRelationship {
    pub source_local_id: u32,
    pub target_local_id: u32,
    pub relation_type: RelationType,
    pub confidence: f32,
    pub metadata: Metadata,
}

/// Counts from applying one extraction batch
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOutcome {
    pub entities_upserted: usize,
    pub relationships_upserted: usize,
}

/// Persistent store for the planning knowledge graph
///
/// Upserts are idempotent: repeating an identical call changes nothing but
/// `updated_at`. Nothing in this trait deletes rows; reindexing is
/// additive/corrective only.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Insert or update an entity, matching on canonical id
    ///
    /// Returns the stored entity with its surrogate id, which is stable
    /// across repeated upserts of the same canonical id.
    async fn upsert_entity(&self, draft: &EntityDraft) -> Result<Entity>;

    /// Insert or update a relationship, matching on (source, target, type)
    ///
    /// Fails with [`crate::Error::MissingEndpoint`] if either endpoint id
    /// does not exist in the store.
    async fn upsert_relationship(&self, draft: &RelationshipDraft) -> Result<Relationship>;

    /// Apply one plan's extraction batch in a single transaction
    ///
    /// Upserts all entities, building a local-id to store-id map scoped to
    /// this call only, then resolves and upserts all relationships through
    /// that map. A relationship referencing a local id no entity defines
    /// fails the whole batch with [`crate::Error::UnmappedLocalId`].
    async fn apply_batch(
        &self,
        entities: &[LocalEntity],
        relationships: &[LocalRelationship],
    ) -> Result<BatchOutcome>;

    /// Fetch an entity by canonical id
    async fn entity_by_canonical_id(&self, canonical_id: &str) -> Result<Option<Entity>>;

    /// Fetch an entity by surrogate id
    async fn entity_by_id(&self, id: &str) -> Result<Option<Entity>>;

    /// List all entities of a given type
    async fn entities_by_type(&self, entity_type: EntityType) -> Result<Vec<Entity>>;

    /// List all relationships of a given type
    async fn relationships_by_type(&self, relation_type: RelationType) -> Result<Vec<Relationship>>;

    /// List all relationships touching an entity, in either direction
    async fn relationships_for_entity(&self, entity_id: &str) -> Result<Vec<Relationship>>;

    /// Count all entities
    async fn count_entities(&self) -> Result<u64>;

    /// Count all relationships
    async fn count_relationships(&self) -> Result<u64>;
}
