//! Planloom Core Library
//!
//! This crate provides the planning intelligence core for Planloom:
//! - Knowledge graph of plans, agents, features, and files (SQLite-backed)
//! - Extraction pipeline turning parsed plan documents into graph batches
//! - Reindex driver with per-batch id remapping and idempotent upserts
//! - Conflict detection (file contention, feature overlap, dependency
//!   cycles, stale work-in-progress)
//! - Task scoring and eligibility with cascading configuration overrides
//!
//! Command-line and protocol surfaces live in separate crates; this library
//! only exposes the operations they call.

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::domain::conflicts::{ConflictDetector, ConflictReport, Severity};
    pub use crate::domain::extraction::{PlanExtractor, PlanRecord, PlanSource, TaskStatus};
    pub use crate::domain::graph::{Entity, EntityType, GraphStore, RelationType, Relationship};
    pub use crate::domain::reindex::{ReindexDriver, ReindexOptions, ReindexReport};
    pub use crate::domain::scoring::{ScoreBreakdown, ScoringEngine, ScoringWeights};
    pub use crate::error::{Error, Result};
    pub use crate::infrastructure::graph::SqliteGraphStore;
    pub use crate::storage::Database;
}
