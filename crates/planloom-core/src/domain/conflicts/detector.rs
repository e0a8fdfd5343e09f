//! Conflict detection over the planning graph
//!
//! All detectors are read-only: they walk the graph the reindex driver
//! built and return findings. No data and no conflicts both come back as an
//! empty list.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::graph::{Entity, EntityType, GraphStore, RelationType};
use crate::error::Result;

use super::report::{ConflictReport, ConflictType, Severity};

/// Tunables for the conflict detectors
///
/// Both thresholds are observed behavior, not architectural invariants;
/// they live here so deployments can move them without a code change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictConfig {
    /// Minimum `SIMILAR_TO` confidence that counts as feature overlap
    #[serde(default = "default_overlap_threshold")]
    pub overlap_confidence_threshold: f32,
    /// Days after which an untouched WIP agent counts as stale
    #[serde(default = "default_stale_wip_days")]
    pub stale_wip_days: i64,
}

fn default_overlap_threshold() -> f32 {
    0.8
}

fn default_stale_wip_days() -> i64 {
    7
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            overlap_confidence_threshold: default_overlap_threshold(),
            stale_wip_days: default_stale_wip_days(),
        }
    }
}

/// Read-only conflict analyses over a graph store
pub struct ConflictDetector<S: GraphStore> {
    store: Arc<S>,
    config: ConflictConfig,
}

impl<S: GraphStore> ConflictDetector<S> {
    /// Create a detector with default thresholds
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            config: ConflictConfig::default(),
        }
    }

    /// Use specific thresholds
    pub fn with_config(mut self, config: ConflictConfig) -> Self {
        self.config = config;
        self
    }

    /// Run every detector and concatenate their findings
    pub async fn detect_all(&self) -> Result<Vec<ConflictReport>> {
        let mut reports = self.detect_file_contention().await?;
        reports.extend(self.detect_feature_overlap().await?);
        reports.extend(self.detect_circular_dependencies().await?);
        reports.extend(self.detect_stale_wip().await?);

        debug!(report_count = reports.len(), "Conflict detection completed");
        Ok(reports)
    }

    /// Find files that two or more in-progress agents are modifying
    ///
    /// Agents whose status is anything but `WIP` never count toward
    /// contention, no matter how many of them touch the file.
    pub async fn detect_file_contention(&self) -> Result<Vec<ConflictReport>> {
        let modifies = self
            .store
            .relationships_by_type(RelationType::Modifies)
            .await?;
        let agents = entity_index(self.store.entities_by_type(EntityType::Agent).await?);
        let files = entity_index(self.store.entities_by_type(EntityType::File).await?);

        // Keyed by file canonical id so report order is stable
        let mut wip_by_file: BTreeMap<String, (String, Vec<String>)> = BTreeMap::new();
        for relationship in &modifies {
            let (Some(agent), Some(file)) = (
                agents.get(&relationship.source_id),
                files.get(&relationship.target_id),
            ) else {
                continue;
            };
            if agent.status() != Some("WIP") {
                continue;
            }
            wip_by_file
                .entry(file.canonical_id.clone())
                .or_insert_with(|| (file.name.clone(), Vec::new()))
                .1
                .push(agent.canonical_id.clone());
        }

        let mut reports = Vec::new();
        for (file_canonical_id, (file_name, mut wip_agents)) in wip_by_file {
            if wip_agents.len() < 2 {
                continue;
            }
            wip_agents.sort();

            let mut affected = vec![file_canonical_id];
            affected.extend(wip_agents.iter().cloned());
            reports.push(ConflictReport {
                conflict_type: ConflictType::FileContention,
                severity: Severity::Error,
                message: format!(
                    "{} agents in progress are all modifying {}: {}",
                    wip_agents.len(),
                    file_name,
                    wip_agents.join(", ")
                ),
                affected_entities: affected,
            });
        }

        Ok(reports)
    }

    /// Find feature pairs whose similarity is high enough to suggest
    /// duplicated work
    pub async fn detect_feature_overlap(&self) -> Result<Vec<ConflictReport>> {
        let similar = self
            .store
            .relationships_by_type(RelationType::SimilarTo)
            .await?;

        let mut reports = Vec::new();
        for relationship in similar {
            if relationship.confidence < self.config.overlap_confidence_threshold {
                continue;
            }

            let (Some(source), Some(target)) = (
                self.store.entity_by_id(&relationship.source_id).await?,
                self.store.entity_by_id(&relationship.target_id).await?,
            ) else {
                continue;
            };

            reports.push(ConflictReport {
                conflict_type: ConflictType::FeatureOverlap,
                severity: Severity::Warning,
                message: format!(
                    "Features '{}' and '{}' look like the same work (similarity {:.2})",
                    source.name, target.name, relationship.confidence
                ),
                affected_entities: vec![source.canonical_id, target.canonical_id],
            });
        }

        Ok(reports)
    }

    /// Find dependency cycles via a three-color depth-first search
    ///
    /// One report per distinct cycle, listing the cycle's canonical ids in
    /// traversal order. An acyclic graph yields no reports.
    pub async fn detect_circular_dependencies(&self) -> Result<Vec<ConflictReport>> {
        let depends = self
            .store
            .relationships_by_type(RelationType::DependsOn)
            .await?;
        if depends.is_empty() {
            return Ok(Vec::new());
        }

        let mut adjacency: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut node_ids: HashSet<String> = HashSet::new();
        for relationship in &depends {
            adjacency
                .entry(relationship.source_id.clone())
                .or_default()
                .push(relationship.target_id.clone());
            node_ids.insert(relationship.source_id.clone());
            node_ids.insert(relationship.target_id.clone());
        }
        for targets in adjacency.values_mut() {
            targets.sort();
        }

        let cycles = find_cycles(&adjacency);
        if cycles.is_empty() {
            return Ok(Vec::new());
        }

        // Resolve ids to canonical ids for the reports
        let mut canonical: HashMap<String, String> = HashMap::with_capacity(node_ids.len());
        for id in &node_ids {
            if let Some(entity) = self.store.entity_by_id(id).await? {
                canonical.insert(id.clone(), entity.canonical_id);
            }
        }

        let mut reports = Vec::new();
        for cycle in cycles {
            let names: Vec<String> = cycle
                .iter()
                .map(|id| canonical.get(id).cloned().unwrap_or_else(|| id.clone()))
                .collect();
            let mut path = names.clone();
            path.push(names[0].clone());

            reports.push(ConflictReport {
                conflict_type: ConflictType::CircularDependency,
                severity: Severity::Error,
                message: format!("Circular dependency: {}", path.join(" -> ")),
                affected_entities: names,
            });
        }

        Ok(reports)
    }

    /// Find in-progress agents that have not been touched within the
    /// configured staleness window
    pub async fn detect_stale_wip(&self) -> Result<Vec<ConflictReport>> {
        let agents = self.store.entities_by_type(EntityType::Agent).await?;
        let cutoff = Utc::now() - Duration::days(self.config.stale_wip_days);

        let mut reports = Vec::new();
        for agent in agents {
            if agent.status() != Some("WIP") || agent.updated_at >= cutoff {
                continue;
            }

            let age_days = (Utc::now() - agent.updated_at).num_days();
            reports.push(ConflictReport {
                conflict_type: ConflictType::StaleWip,
                severity: Severity::Warning,
                message: format!(
                    "Agent {} has been in progress without updates for {} days",
                    agent.canonical_id, age_days
                ),
                affected_entities: vec![agent.canonical_id],
            });
        }

        Ok(reports)
    }
}

fn entity_index(entities: Vec<Entity>) -> HashMap<String, Entity> {
    entities.into_iter().map(|e| (e.id.clone(), e)).collect()
}

/// Three-color DFS cycle search over an adjacency map
///
/// Returns each distinct cycle once, in traversal order. Distinctness is by
/// rotation: `B -> C -> B` reached from two different roots is one cycle.
fn find_cycles(adjacency: &BTreeMap<String, Vec<String>>) -> Vec<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    fn visit(
        node: &str,
        adjacency: &BTreeMap<String, Vec<String>>,
        colors: &mut HashMap<String, Color>,
        stack: &mut Vec<String>,
        seen: &mut HashSet<Vec<String>>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        colors.insert(node.to_string(), Color::Gray);
        stack.push(node.to_string());

        if let Some(targets) = adjacency.get(node) {
            for target in targets {
                match colors.get(target).copied().unwrap_or(Color::White) {
                    Color::White => {
                        visit(target, adjacency, colors, stack, seen, cycles);
                    }
                    Color::Gray => {
                        // Back edge: the cycle is the stack suffix from the
                        // gray target onward
                        if let Some(start) = stack.iter().position(|n| n == target) {
                            let cycle: Vec<String> = stack[start..].to_vec();
                            if seen.insert(normalize_rotation(&cycle)) {
                                cycles.push(cycle);
                            }
                        }
                    }
                    Color::Black => {}
                }
            }
        }

        stack.pop();
        colors.insert(node.to_string(), Color::Black);
    }

    let mut colors: HashMap<String, Color> = HashMap::new();
    let mut stack = Vec::new();
    let mut seen = HashSet::new();
    let mut cycles = Vec::new();

    for node in adjacency.keys() {
        if colors.get(node).copied().unwrap_or(Color::White) == Color::White {
            visit(node, adjacency, &mut colors, &mut stack, &mut seen, &mut cycles);
        }
    }

    cycles
}

/// Rotate a cycle so its smallest element comes first, for deduplication
fn normalize_rotation(cycle: &[String]) -> Vec<String> {
    let Some(min_pos) = cycle
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(i, _)| i)
    else {
        return Vec::new();
    };

    let mut rotated = Vec::with_capacity(cycle.len());
    rotated.extend_from_slice(&cycle[min_pos..]);
    rotated.extend_from_slice(&cycle[..min_pos]);
    rotated
}
