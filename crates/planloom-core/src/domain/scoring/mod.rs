//! Task scoring and eligibility
//!
//! Consumes parsed plan/agent records plus scoring configuration and
//! decides which task to work on next. Eligibility gates first (status
//! `GAP`, all dependencies `PASS`); only eligible tasks get a score.
//! Configuration cascades config -> plan frontmatter -> agent frontmatter
//! through an explicit ordered merge.

mod config;
mod engine;

pub use config::{
    PartialWeights, ScoringBiases, ScoringConfig, ScoringOverrides, ScoringProfile, ScoringWeights,
};
pub use engine::{ScoreBreakdown, ScoringEngine, ScoringReport, TaskRecord};
