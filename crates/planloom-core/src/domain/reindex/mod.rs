//! Reindex driver
//!
//! Walks plans in numeric order, extracts each into a batch, and applies
//! the batch to the store. Every batch gets its own local-id map inside
//! `apply_batch`, so two plans that both number their entities from 1 can
//! never cross-wire relationships. A failing plan becomes a warning, not an
//! aborted run.
//!
//! After all plans are applied, a similarity pass compares feature names
//! across plans and writes `SIMILAR_TO` edges with the similarity as
//! confidence; those edges feed the feature-overlap conflict detector.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::extraction::{PlanExtractor, PlanSource};
use crate::domain::graph::{EntityType, GraphStore, Metadata, RelationType, RelationshipDraft};
use crate::error::{Error, Result};

/// Options for a reindex run
#[derive(Debug, Clone)]
pub struct ReindexOptions {
    /// Restrict the run to one plan id
    pub plan_id: Option<String>,
    /// Minimum name similarity at which a `SIMILAR_TO` edge is written
    pub similarity_floor: f32,
}

impl Default for ReindexOptions {
    fn default() -> Self {
        Self {
            plan_id: None,
            similarity_floor: 0.5,
        }
    }
}

impl ReindexOptions {
    /// Restrict the run to one plan
    pub fn for_plan(plan_id: impl Into<String>) -> Self {
        Self {
            plan_id: Some(plan_id.into()),
            ..Default::default()
        }
    }
}

/// Outcome of a reindex run
#[derive(Debug, Clone, Default)]
pub struct ReindexReport {
    /// Plans whose batch was applied successfully
    pub plans_processed: usize,
    /// Entities upserted across all batches
    pub entities_upserted: usize,
    /// Relationships upserted across all batches and the similarity pass
    pub relationships_upserted: usize,
    /// Accumulated warnings from extraction, batch application, and inference
    pub warnings: Vec<String>,
}

/// Drives extraction and batch application over a plan source
pub struct ReindexDriver<S: GraphStore> {
    store: Arc<S>,
    extractor: PlanExtractor,
}

impl<S: GraphStore> ReindexDriver<S> {
    /// Create a new reindex driver over a graph store
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            extractor: PlanExtractor::new(),
        }
    }

    /// Reindex all plans from the source, or one plan when filtered
    ///
    /// Plans are processed in ascending plan-number order so repeated runs
    /// observe the same ordering regardless of how the source lists them.
    /// Returns [`Error::PlanNotFound`] when a `plan_id` filter matches
    /// nothing; individual plan failures are reported as warnings.
    pub async fn reindex(
        &self,
        source: &dyn PlanSource,
        options: &ReindexOptions,
    ) -> Result<ReindexReport> {
        let mut plans = source.load_plans()?;

        if let Some(plan_id) = &options.plan_id {
            plans.retain(|p| p.plan_id == *plan_id);
            if plans.is_empty() {
                return Err(Error::PlanNotFound(plan_id.clone()));
            }
        }

        plans.sort_by_key(|p| p.plan_number);

        let mut report = ReindexReport::default();

        for plan in &plans {
            let batch = self.extractor.extract_plan(plan);
            report.warnings.extend(batch.warnings.iter().cloned());

            match self
                .store
                .apply_batch(&batch.entities, &batch.relationships)
                .await
            {
                Ok(outcome) => {
                    report.plans_processed += 1;
                    report.entities_upserted += outcome.entities_upserted;
                    report.relationships_upserted += outcome.relationships_upserted;
                }
                Err(e) => {
                    warn!(plan_id = %plan.plan_id, error = %e, "Plan batch failed, continuing");
                    report
                        .warnings
                        .push(format!("plan {}: {}", plan.plan_id, e));
                }
            }
        }

        report.relationships_upserted += self
            .infer_feature_similarity(options.similarity_floor, &mut report.warnings)
            .await?;

        info!(
            plans_processed = report.plans_processed,
            entities = report.entities_upserted,
            relationships = report.relationships_upserted,
            warnings = report.warnings.len(),
            "Reindex completed"
        );
        Ok(report)
    }

    /// Write `SIMILAR_TO` edges between similarly-named features of
    /// different plans
    ///
    /// Similarity is token-set Jaccard over the feature names, which keeps
    /// the pass deterministic. Edge direction is fixed by canonical-id order
    /// so a repeat run upserts the same row instead of adding a mirror edge.
    async fn infer_feature_similarity(
        &self,
        floor: f32,
        warnings: &mut Vec<String>,
    ) -> Result<usize> {
        let features = self.store.entities_by_type(EntityType::Feature).await?;
        let mut written = 0usize;

        for (i, a) in features.iter().enumerate() {
            for b in features.iter().skip(i + 1) {
                let (Some(plan_a), Some(plan_b)) =
                    (a.metadata_str("plan"), b.metadata_str("plan"))
                else {
                    continue;
                };
                if plan_a == plan_b {
                    continue;
                }

                let similarity = name_similarity(&a.name, &b.name);
                if similarity < floor {
                    continue;
                }

                let (source, target) = if a.canonical_id <= b.canonical_id {
                    (a, b)
                } else {
                    (b, a)
                };
                let mut metadata = Metadata::new();
                metadata.insert("inferred_by".into(), "name_token_jaccard".into());

                let draft = RelationshipDraft {
                    source_id: source.id.clone(),
                    target_id: target.id.clone(),
                    relation_type: RelationType::SimilarTo,
                    confidence: similarity,
                    metadata,
                };
                match self.store.upsert_relationship(&draft).await {
                    Ok(_) => written += 1,
                    Err(e) => {
                        warn!(
                            source = %source.canonical_id,
                            target = %target.canonical_id,
                            error = %e,
                            "Similarity edge upsert failed"
                        );
                        warnings.push(format!(
                            "similarity {} ~ {}: {}",
                            source.canonical_id, target.canonical_id, e
                        ));
                    }
                }
            }
        }

        Ok(written)
    }
}

/// Token-set Jaccard similarity between two display names
fn name_similarity(a: &str, b: &str) -> f32 {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();
    intersection as f32 / union as f32
}

fn tokenize(name: &str) -> HashSet<String> {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}
