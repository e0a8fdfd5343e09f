//! SQLite implementation of the GraphStore
//!
//! Upserts match on canonical id (entities) and on the
//! (source, target, type) triple (relationships); surrogate ids and
//! creation timestamps survive every repeat upsert. One extraction batch is
//! applied inside a single transaction so a mid-batch failure cannot leave
//! relationships pointing at store ids that were never committed.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::domain::graph::{
    BatchOutcome, Entity, EntityDraft, EntityType, GraphStore, LocalEntity, LocalRelationship,
    Metadata, RelationType, Relationship, RelationshipDraft,
};
use crate::error::{Error, Result};

/// SQLite implementation of the planning graph store
#[derive(Clone)]
pub struct SqliteGraphStore {
    pool: SqlitePool,
}

impl SqliteGraphStore {
    /// Create a new SQLite graph store over an initialized pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Upsert an entity on a specific connection (pool or transaction)
async fn upsert_entity_on(conn: &mut SqliteConnection, draft: &EntityDraft) -> Result<Entity> {
    let metadata_json = serde_json::to_string(&draft.metadata)
        .map_err(|e| Error::Other(format!("Failed to serialize entity metadata: {}", e)))?;
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO graph_entities (
            id, entity_type, canonical_id, name, source_path, metadata, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(canonical_id) DO UPDATE SET
            entity_type = excluded.entity_type,
            name = excluded.name,
            source_path = excluded.source_path,
            metadata = excluded.metadata,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(draft.entity_type.as_str())
    .bind(&draft.canonical_id)
    .bind(&draft.name)
    .bind(&draft.source_path)
    .bind(&metadata_json)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    let row: EntityRow = sqlx::query_as("SELECT * FROM graph_entities WHERE canonical_id = ?")
        .bind(&draft.canonical_id)
        .fetch_one(&mut *conn)
        .await?;

    let entity = row.into_entity()?;
    debug!(canonical_id = %entity.canonical_id, entity_id = %entity.id, "Entity upserted");
    Ok(entity)
}

/// Upsert a relationship on a specific connection (pool or transaction)
///
/// Both endpoints are verified first so a dangling reference surfaces as a
/// typed integrity error instead of a silently dropped edge.
async fn upsert_relationship_on(
    conn: &mut SqliteConnection,
    draft: &RelationshipDraft,
) -> Result<Relationship> {
    for endpoint in [&draft.source_id, &draft.target_id] {
        let exists: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM graph_entities WHERE id = ?")
            .bind(endpoint)
            .fetch_optional(&mut *conn)
            .await?;
        if exists.is_none() {
            return Err(Error::MissingEndpoint(endpoint.clone()));
        }
    }

    let metadata_json = serde_json::to_string(&draft.metadata)
        .map_err(|e| Error::Other(format!("Failed to serialize relationship metadata: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO graph_relationships (
            id, source_id, target_id, relation_type, confidence, metadata, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(source_id, target_id, relation_type) DO UPDATE SET
            confidence = excluded.confidence,
            metadata = excluded.metadata
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&draft.source_id)
    .bind(&draft.target_id)
    .bind(draft.relation_type.as_str())
    .bind(draft.confidence.clamp(0.0, 1.0))
    .bind(&metadata_json)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await?;

    let row: RelationshipRow = sqlx::query_as(
        r#"
        SELECT * FROM graph_relationships
        WHERE source_id = ? AND target_id = ? AND relation_type = ?
        "#,
    )
    .bind(&draft.source_id)
    .bind(&draft.target_id)
    .bind(draft.relation_type.as_str())
    .fetch_one(&mut *conn)
    .await?;

    let relationship = row.into_relationship()?;
    debug!(
        relationship_id = %relationship.id,
        source = %relationship.source_id,
        target = %relationship.target_id,
        relation_type = %relationship.relation_type,
        "Relationship upserted"
    );
    Ok(relationship)
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn upsert_entity(&self, draft: &EntityDraft) -> Result<Entity> {
        let mut conn = self.pool.acquire().await?;
        upsert_entity_on(&mut conn, draft).await
    }

    async fn upsert_relationship(&self, draft: &RelationshipDraft) -> Result<Relationship> {
        let mut conn = self.pool.acquire().await?;
        upsert_relationship_on(&mut conn, draft).await
    }

    async fn apply_batch(
        &self,
        entities: &[LocalEntity],
        relationships: &[LocalRelationship],
    ) -> Result<BatchOutcome> {
        let mut tx = self.pool.begin().await?;

        // The local-id map lives and dies with this one batch. Plans number
        // their local entities independently from 1, so a map shared across
        // batches would wire one plan's relationships onto another plan's
        // entities whenever the local ids coincide.
        let mut id_map: HashMap<u32, String> = HashMap::with_capacity(entities.len());
        let mut outcome = BatchOutcome::default();

        for local in entities {
            let entity = upsert_entity_on(&mut tx, &local.to_draft()).await?;
            id_map.insert(local.local_id, entity.id);
            outcome.entities_upserted += 1;
        }

        for local in relationships {
            let source_id = id_map
                .get(&local.source_local_id)
                .ok_or(Error::UnmappedLocalId(local.source_local_id))?;
            let target_id = id_map
                .get(&local.target_local_id)
                .ok_or(Error::UnmappedLocalId(local.target_local_id))?;

            let draft = RelationshipDraft {
                source_id: source_id.clone(),
                target_id: target_id.clone(),
                relation_type: local.relation_type,
                confidence: local.confidence,
                metadata: local.metadata.clone(),
            };
            upsert_relationship_on(&mut tx, &draft).await?;
            outcome.relationships_upserted += 1;
        }

        tx.commit().await?;

        debug!(
            entities = outcome.entities_upserted,
            relationships = outcome.relationships_upserted,
            "Batch applied"
        );
        Ok(outcome)
    }

    async fn entity_by_canonical_id(&self, canonical_id: &str) -> Result<Option<Entity>> {
        let row: Option<EntityRow> =
            sqlx::query_as("SELECT * FROM graph_entities WHERE canonical_id = ?")
                .bind(canonical_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|r| r.into_entity()).transpose()
    }

    async fn entity_by_id(&self, id: &str) -> Result<Option<Entity>> {
        let row: Option<EntityRow> = sqlx::query_as("SELECT * FROM graph_entities WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_entity()).transpose()
    }

    async fn entities_by_type(&self, entity_type: EntityType) -> Result<Vec<Entity>> {
        let rows: Vec<EntityRow> = sqlx::query_as(
            "SELECT * FROM graph_entities WHERE entity_type = ? ORDER BY canonical_id",
        )
        .bind(entity_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.into_entity()).collect()
    }

    async fn relationships_by_type(&self, relation_type: RelationType) -> Result<Vec<Relationship>> {
        let rows: Vec<RelationshipRow> = sqlx::query_as(
            r#"
            SELECT * FROM graph_relationships
            WHERE relation_type = ?
            ORDER BY source_id, target_id
            "#,
        )
        .bind(relation_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.into_relationship()).collect()
    }

    async fn relationships_for_entity(&self, entity_id: &str) -> Result<Vec<Relationship>> {
        let rows: Vec<RelationshipRow> = sqlx::query_as(
            r#"
            SELECT * FROM graph_relationships
            WHERE source_id = ? OR target_id = ?
            ORDER BY source_id, target_id
            "#,
        )
        .bind(entity_id)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.into_relationship()).collect()
    }

    async fn count_entities(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM graph_entities")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn count_relationships(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM graph_relationships")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

// ========== Database Row Types ==========

#[derive(Debug, FromRow)]
struct EntityRow {
    id: String,
    entity_type: String,
    canonical_id: String,
    name: String,
    source_path: Option<String>,
    metadata: Option<String>,
    created_at: String,
    updated_at: String,
}

impl EntityRow {
    fn into_entity(self) -> Result<Entity> {
        let entity_type = EntityType::parse(&self.entity_type)
            .ok_or_else(|| Error::Other(format!("Invalid entity type: {}", self.entity_type)))?;

        let metadata: Metadata = self
            .metadata
            .as_ref()
            .map(|s| serde_json::from_str(s).unwrap_or_default())
            .unwrap_or_default();

        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let updated_at = DateTime::parse_from_rfc3339(&self.updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Entity {
            id: self.id,
            entity_type,
            canonical_id: self.canonical_id,
            name: self.name,
            source_path: self.source_path,
            metadata,
            created_at,
            updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RelationshipRow {
    id: String,
    source_id: String,
    target_id: String,
    relation_type: String,
    confidence: f32,
    metadata: Option<String>,
    created_at: String,
}

impl RelationshipRow {
    fn into_relationship(self) -> Result<Relationship> {
        let relation_type = RelationType::parse(&self.relation_type).ok_or_else(|| {
            Error::Other(format!("Invalid relation type: {}", self.relation_type))
        })?;

        let metadata: Metadata = self
            .metadata
            .as_ref()
            .map(|s| serde_json::from_str(s).unwrap_or_default())
            .unwrap_or_default();

        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Relationship {
            id: self.id,
            source_id: self.source_id,
            target_id: self.target_id,
            relation_type,
            confidence: self.confidence,
            metadata,
            created_at,
        })
    }
}
