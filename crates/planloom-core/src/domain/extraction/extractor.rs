//! Entity extraction from parsed plan records
//!
//! Turns one plan's records into a batch of entities and relationships
//! numbered with batch-local ids. Extraction is pure: it never touches the
//! store, and malformed units are skipped with a warning instead of
//! aborting the batch.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::domain::graph::{
    EntityType, LocalEntity, LocalRelationship, Metadata, RelationType, agent_canonical_id,
    feature_canonical_id, file_canonical_id, plan_canonical_id,
};

use super::records::{PlanRecord, TaskStatus};

/// One plan's extraction result, ids scoped to this batch only
///
/// Local ids are sequential integers starting at 1. They mean nothing
/// outside this batch: the store assigns real ids during
/// [`crate::domain::graph::GraphStore::apply_batch`].
#[derive(Debug, Clone, Default)]
pub struct ExtractionBatch {
    pub entities: Vec<LocalEntity>,
    pub relationships: Vec<LocalRelationship>,
    pub warnings: Vec<String>,
}

/// Extracts graph batches from parsed plan records
#[derive(Debug, Clone, Default)]
pub struct PlanExtractor;

impl PlanExtractor {
    /// Create a new plan extractor
    pub fn new() -> Self {
        Self
    }

    /// Extract one plan into a locally-id'd entity/relationship batch
    pub fn extract_plan(&self, plan: &PlanRecord) -> ExtractionBatch {
        let mut batch = ExtractionBatch::default();
        let mut next_id: u32 = 1;

        // Plan node
        let mut plan_metadata = Metadata::new();
        plan_metadata.insert("plan_number".into(), Value::from(plan.plan_number));
        if let Some(status) = &plan.status {
            plan_metadata.insert("status".into(), Value::String(status.clone()));
        }
        let plan_local_id = alloc(
            &mut batch,
            LocalEntity {
                local_id: take_id(&mut next_id),
                entity_type: EntityType::Plan,
                canonical_id: plan_canonical_id(&plan.plan_id),
                name: plan.name.clone(),
                source_path: plan.path.clone(),
                metadata: plan_metadata,
            },
        );

        // Feature nodes, contained by the plan
        let mut seen_features: HashMap<&str, u32> = HashMap::new();
        for feature in &plan.features {
            if seen_features.contains_key(feature.feature_id.as_str()) {
                batch.warnings.push(format!(
                    "plan {}: duplicate feature id '{}', skipped",
                    plan.plan_id, feature.feature_id
                ));
                continue;
            }

            let mut metadata = Metadata::new();
            metadata.insert("plan".into(), Value::String(plan.plan_id.clone()));
            if let Some(description) = &feature.description {
                metadata.insert("description".into(), Value::String(description.clone()));
            }
            let feature_local_id = alloc(
                &mut batch,
                LocalEntity {
                    local_id: take_id(&mut next_id),
                    entity_type: EntityType::Feature,
                    canonical_id: feature_canonical_id(&plan.plan_id, &feature.feature_id),
                    name: feature.title.clone(),
                    source_path: plan.path.clone(),
                    metadata,
                },
            );
            seen_features.insert(&feature.feature_id, feature_local_id);

            batch.relationships.push(structural(
                plan_local_id,
                feature_local_id,
                RelationType::Contains,
            ));
        }

        // Agent nodes, contained by the plan
        let mut agent_ids: HashMap<u32, u32> = HashMap::new();
        for agent in &plan.agents {
            if agent_ids.contains_key(&agent.ordinal) {
                batch.warnings.push(format!(
                    "plan {}: duplicate agent ordinal {}, skipped",
                    plan.plan_id, agent.ordinal
                ));
                continue;
            }

            let mut metadata = Metadata::new();
            metadata.insert("plan".into(), Value::String(plan.plan_id.clone()));
            metadata.insert("ordinal".into(), Value::from(agent.ordinal));
            metadata.insert("status".into(), Value::String(agent.status.as_str().into()));
            if let Some(persona) = &agent.persona {
                metadata.insert("persona".into(), Value::String(persona.clone()));
            }
            let agent_local_id = alloc(
                &mut batch,
                LocalEntity {
                    local_id: take_id(&mut next_id),
                    entity_type: EntityType::Agent,
                    canonical_id: agent_canonical_id(&plan.plan_id, agent.ordinal),
                    name: format!("{} agent {:03}", plan.plan_id, agent.ordinal),
                    source_path: plan.path.clone(),
                    metadata,
                },
            );
            agent_ids.insert(agent.ordinal, agent_local_id);

            batch.relationships.push(structural(
                plan_local_id,
                agent_local_id,
                RelationType::Contains,
            ));
        }

        // File nodes (derived, deduplicated within the batch) and MODIFIES
        let mut file_ids: HashMap<String, u32> = HashMap::new();
        for agent in &plan.agents {
            let Some(&agent_local_id) = agent_ids.get(&agent.ordinal) else {
                continue; // duplicate ordinal skipped above
            };

            for path in &agent.files_touched {
                let file_local_id = match file_ids.get(path) {
                    Some(&id) => id,
                    None => {
                        let mut metadata = Metadata::new();
                        metadata.insert("path".into(), Value::String(path.clone()));
                        let id = alloc(
                            &mut batch,
                            LocalEntity {
                                local_id: take_id(&mut next_id),
                                entity_type: EntityType::File,
                                canonical_id: file_canonical_id(path),
                                name: path.clone(),
                                source_path: None,
                                metadata,
                            },
                        );
                        file_ids.insert(path.clone(), id);
                        id
                    }
                };

                batch.relationships.push(structural(
                    agent_local_id,
                    file_local_id,
                    RelationType::Modifies,
                ));
            }
        }

        // Dependency edges, resolved within the plan
        for agent in &plan.agents {
            let Some(&agent_local_id) = agent_ids.get(&agent.ordinal) else {
                continue;
            };

            for dependency in &agent.dependencies {
                let resolved = match parse_dependency(dependency, &plan.plan_id) {
                    Some((dep_plan, ordinal)) if dep_plan == plan.plan_id => {
                        agent_ids.get(&ordinal).copied()
                    }
                    Some((dep_plan, _)) => {
                        batch.warnings.push(format!(
                            "plan {}: agent {:03} depends on plan {} which is outside this batch, edge skipped",
                            plan.plan_id, agent.ordinal, dep_plan
                        ));
                        continue;
                    }
                    None => None,
                };

                let Some(dep_local_id) = resolved else {
                    batch.warnings.push(format!(
                        "plan {}: agent {:03} has unresolvable dependency '{}', edge skipped",
                        plan.plan_id, agent.ordinal, dependency
                    ));
                    continue;
                };

                batch.relationships.push(structural(
                    agent_local_id,
                    dep_local_id,
                    RelationType::DependsOn,
                ));

                // A blocked agent's dependency is what blocks it
                if agent.status == TaskStatus::Blocked {
                    batch.relationships.push(structural(
                        dep_local_id,
                        agent_local_id,
                        RelationType::Blocks,
                    ));
                }
            }
        }

        debug!(
            plan_id = %plan.plan_id,
            entities = batch.entities.len(),
            relationships = batch.relationships.len(),
            warnings = batch.warnings.len(),
            "Plan extracted"
        );
        batch
    }
}

fn take_id(next_id: &mut u32) -> u32 {
    let id = *next_id;
    *next_id += 1;
    id
}

fn alloc(batch: &mut ExtractionBatch, entity: LocalEntity) -> u32 {
    let id = entity.local_id;
    batch.entities.push(entity);
    id
}

fn structural(source: u32, target: u32, relation_type: RelationType) -> LocalRelationship {
    LocalRelationship {
        source_local_id: source,
        target_local_id: target,
        relation_type,
        confidence: 1.0,
        metadata: Metadata::new(),
    }
}

/// Parse a dependency reference into (plan id, ordinal)
///
/// Accepts `{planId}#{NNN}` and a bare ordinal meaning "within this plan".
fn parse_dependency(dependency: &str, own_plan_id: &str) -> Option<(String, u32)> {
    match dependency.split_once('#') {
        Some((plan, ordinal)) => {
            let ordinal = ordinal.parse().ok()?;
            Some((plan.to_string(), ordinal))
        }
        None => {
            let ordinal = dependency.trim().parse().ok()?;
            Some((own_plan_id.to_string(), ordinal))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::extraction::records::{AgentRecord, FeatureRecord};

    fn agent(ordinal: u32, status: TaskStatus) -> AgentRecord {
        AgentRecord {
            ordinal,
            status,
            persona: None,
            dependencies: vec![],
            files_touched: vec![],
            overrides: None,
        }
    }

    fn plan(plan_id: &str, plan_number: u32) -> PlanRecord {
        PlanRecord {
            plan_id: plan_id.into(),
            plan_number,
            name: format!("Plan {}", plan_id),
            path: Some(format!("plans/{}", plan_id)),
            status: None,
            overrides: None,
            agents: vec![],
            features: vec![],
        }
    }

    #[test]
    fn test_local_ids_start_at_one_and_are_sequential() {
        let mut record = plan("007", 7);
        record.agents = vec![agent(0, TaskStatus::Gap), agent(1, TaskStatus::Gap)];

        let batch = PlanExtractor::new().extract_plan(&record);

        let ids: Vec<u32> = batch.entities.iter().map(|e| e.local_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(batch.warnings.is_empty());
    }

    #[test]
    fn test_structural_relationships() {
        let mut record = plan("007", 7);
        record.features = vec![FeatureRecord {
            feature_id: "auth".into(),
            title: "Authentication".into(),
            description: None,
        }];
        record.agents = vec![
            {
                let mut a = agent(0, TaskStatus::Pass);
                a.files_touched = vec!["src/auth.rs".into()];
                a
            },
            {
                let mut a = agent(1, TaskStatus::Gap);
                a.dependencies = vec!["007#000".into()];
                a.files_touched = vec!["src/auth.rs".into()];
                a
            },
        ];

        let batch = PlanExtractor::new().extract_plan(&record);

        // plan, feature, 2 agents, 1 deduplicated file
        assert_eq!(batch.entities.len(), 5);

        let count = |t: RelationType| {
            batch
                .relationships
                .iter()
                .filter(|r| r.relation_type == t)
                .count()
        };
        assert_eq!(count(RelationType::Contains), 3); // feature + 2 agents
        assert_eq!(count(RelationType::Modifies), 2);
        assert_eq!(count(RelationType::DependsOn), 1);
        assert_eq!(count(RelationType::Blocks), 0);
        assert!(batch.relationships.iter().all(|r| r.confidence == 1.0));
    }

    #[test]
    fn test_blocked_agent_produces_blocks_edge() {
        let mut record = plan("007", 7);
        record.agents = vec![agent(0, TaskStatus::Wip), {
            let mut a = agent(1, TaskStatus::Blocked);
            a.dependencies = vec!["0".into()];
            a
        }];

        let batch = PlanExtractor::new().extract_plan(&record);

        let blocks: Vec<_> = batch
            .relationships
            .iter()
            .filter(|r| r.relation_type == RelationType::Blocks)
            .collect();
        assert_eq!(blocks.len(), 1);

        let agent0 = batch
            .entities
            .iter()
            .find(|e| e.canonical_id == "agent:007#000")
            .unwrap();
        let agent1 = batch
            .entities
            .iter()
            .find(|e| e.canonical_id == "agent:007#001")
            .unwrap();
        assert_eq!(blocks[0].source_local_id, agent0.local_id);
        assert_eq!(blocks[0].target_local_id, agent1.local_id);
    }

    #[test]
    fn test_malformed_dependency_warns_and_continues() {
        let mut record = plan("007", 7);
        record.agents = vec![agent(0, TaskStatus::Pass), {
            let mut a = agent(1, TaskStatus::Gap);
            a.dependencies = vec!["garbage!!".into(), "000".into()];
            a
        }];

        let batch = PlanExtractor::new().extract_plan(&record);

        assert_eq!(batch.warnings.len(), 1);
        assert!(batch.warnings[0].contains("garbage!!"));
        // The valid dependency still produced an edge
        assert_eq!(
            batch
                .relationships
                .iter()
                .filter(|r| r.relation_type == RelationType::DependsOn)
                .count(),
            1
        );
    }

    #[test]
    fn test_duplicate_ordinal_warns_and_skips() {
        let mut record = plan("007", 7);
        record.agents = vec![agent(0, TaskStatus::Gap), agent(0, TaskStatus::Wip)];

        let batch = PlanExtractor::new().extract_plan(&record);

        assert_eq!(batch.warnings.len(), 1);
        let agents = batch
            .entities
            .iter()
            .filter(|e| e.entity_type == EntityType::Agent)
            .count();
        assert_eq!(agents, 1);
    }

    #[test]
    fn test_cross_plan_dependency_is_skipped_with_warning() {
        let mut record = plan("007", 7);
        record.agents = vec![{
            let mut a = agent(0, TaskStatus::Gap);
            a.dependencies = vec!["006#002".into()];
            a
        }];

        let batch = PlanExtractor::new().extract_plan(&record);

        assert_eq!(batch.warnings.len(), 1);
        assert!(batch.warnings[0].contains("plan 006"));
        assert!(
            batch
                .relationships
                .iter()
                .all(|r| r.relation_type != RelationType::DependsOn)
        );
    }

    #[test]
    fn test_agent_metadata_carries_status_and_persona() {
        let mut record = plan("007", 7);
        record.agents = vec![{
            let mut a = agent(2, TaskStatus::Wip);
            a.persona = Some("backend".into());
            a
        }];

        let batch = PlanExtractor::new().extract_plan(&record);

        let entity = batch
            .entities
            .iter()
            .find(|e| e.entity_type == EntityType::Agent)
            .unwrap();
        assert_eq!(entity.canonical_id, "agent:007#002");
        assert_eq!(entity.metadata["status"], "WIP");
        assert_eq!(entity.metadata["persona"], "backend");
        assert_eq!(entity.metadata["ordinal"], 2);
    }
}
