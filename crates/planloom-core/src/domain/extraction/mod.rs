//! Extraction pipeline: parsed plan records to graph batches
//!
//! Document parsing is an external collaborator; it hands this module typed
//! [`PlanRecord`]s. The [`PlanExtractor`] turns one record into an
//! [`ExtractionBatch`] whose entity ids are local to that single batch —
//! the reindex driver and store resolve them to store ids per batch, never
//! across batches.

mod extractor;
mod records;

pub use extractor::{ExtractionBatch, PlanExtractor};
pub use records::{
    AgentRecord, FeatureRecord, PlanRecord, PlanSource, StaticPlanSource, TaskStatus,
};
