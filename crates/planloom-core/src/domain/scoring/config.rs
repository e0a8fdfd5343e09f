//! Scoring configuration: weights, biases, presets, and the override cascade
//!
//! Configuration cascades config -> plan frontmatter -> agent frontmatter.
//! The cascade is an explicit, ordered merge: each level overlays only the
//! keys it defines, so a plan can retune one weight while an agent retunes
//! another and both take effect.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Maximum points each scoring term can contribute
///
/// Defaults sum to 100: dependency 40, priority 30, workload 30.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Points for a task whose dependencies are all satisfied
    #[serde(default = "default_dependency_weight")]
    pub dependency: f32,
    /// Maximum points for early-ordinal tasks; decays 10% of max per step
    #[serde(default = "default_priority_weight")]
    pub priority: f32,
    /// Maximum points for small tasks; decays max/6 per file touched
    #[serde(default = "default_workload_weight")]
    pub workload: f32,
}

fn default_dependency_weight() -> f32 {
    40.0
}

fn default_priority_weight() -> f32 {
    30.0
}

fn default_workload_weight() -> f32 {
    30.0
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            dependency: default_dependency_weight(),
            priority: default_priority_weight(),
            workload: default_workload_weight(),
        }
    }
}

impl ScoringWeights {
    /// Overlay the fields a partial override defines
    pub fn overlaid_with(mut self, partial: &PartialWeights) -> Self {
        if let Some(dependency) = partial.dependency {
            self.dependency = dependency;
        }
        if let Some(priority) = partial.priority {
            self.priority = priority;
        }
        if let Some(workload) = partial.workload {
            self.workload = workload;
        }
        self
    }
}

/// Weight fields a single override level chooses to set
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialWeights {
    #[serde(default)]
    pub dependency: Option<f32>,
    #[serde(default)]
    pub priority: Option<f32>,
    #[serde(default)]
    pub workload: Option<f32>,
}

/// Additive scoring adjustments keyed by plan id, persona, and status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringBiases {
    #[serde(default)]
    pub plans: HashMap<String, f32>,
    #[serde(default)]
    pub personas: HashMap<String, f32>,
    #[serde(default)]
    pub statuses: HashMap<String, f32>,
}

impl ScoringBiases {
    /// Merge another bias set over this one, per key
    ///
    /// Keys the overlay defines win; keys it does not define survive. Kinds
    /// stay independent: a plan bias never shadows a persona bias.
    pub fn merged_with(&self, overlay: &ScoringBiases) -> ScoringBiases {
        let mut merged = self.clone();
        merged.plans.extend(overlay.plans.clone());
        merged.personas.extend(overlay.personas.clone());
        merged.statuses.extend(overlay.statuses.clone());
        merged
    }
}

/// A named weights/biases bundle selectable from an override
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringProfile {
    #[serde(default)]
    pub weights: PartialWeights,
    #[serde(default)]
    pub biases: ScoringBiases,
}

/// Scoring overrides carried in plan or agent frontmatter
///
/// Every field is optional; an empty override changes nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringOverrides {
    /// Name of a configured preset to apply before the explicit fields
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub weights: Option<PartialWeights>,
    #[serde(default)]
    pub biases: Option<ScoringBiases>,
}

impl ScoringOverrides {
    /// Parse overrides from a raw frontmatter value
    ///
    /// The caller decides what to do on failure; per the degraded-input
    /// policy that is a warning plus a zero contribution, never an abort.
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| Error::InvalidInput(format!("unparsable scoring overrides: {}", e)))
    }
}

/// Default scoring configuration plus named presets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default)]
    pub biases: ScoringBiases,
    #[serde(default)]
    pub presets: HashMap<String, ScoringProfile>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_weights_sum_to_one_hundred() {
        let weights = ScoringWeights::default();
        assert_eq!(weights.dependency, 40.0);
        assert_eq!(weights.priority, 30.0);
        assert_eq!(weights.workload, 30.0);
    }

    #[test]
    fn test_overlay_keeps_unset_fields() {
        let weights = ScoringWeights::default().overlaid_with(&PartialWeights {
            priority: Some(50.0),
            ..Default::default()
        });

        assert_eq!(weights.dependency, 40.0);
        assert_eq!(weights.priority, 50.0);
        assert_eq!(weights.workload, 30.0);
    }

    #[test]
    fn test_bias_merge_is_per_key() {
        let mut base = ScoringBiases::default();
        base.plans.insert("007".into(), 20.0);
        base.personas.insert("backend".into(), 5.0);

        let mut overlay = ScoringBiases::default();
        overlay.personas.insert("backend".into(), 10.0);

        let merged = base.merged_with(&overlay);
        assert_eq!(merged.plans["007"], 20.0);
        assert_eq!(merged.personas["backend"], 10.0);
    }

    #[test]
    fn test_overrides_parse_from_frontmatter_value() {
        let value = json!({
            "weights": { "priority": 10.0 },
            "biases": { "personas": { "reviewer": 5.0 } }
        });

        let overrides = ScoringOverrides::from_value(&value).unwrap();
        assert_eq!(overrides.weights.unwrap().priority, Some(10.0));
        assert_eq!(overrides.biases.unwrap().personas["reviewer"], 5.0);
    }

    #[test]
    fn test_malformed_overrides_are_invalid_input() {
        let err = ScoringOverrides::from_value(&json!("not an object")).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_empty_override_changes_nothing() {
        let overrides = ScoringOverrides::from_value(&json!({})).unwrap();
        assert_eq!(overrides, ScoringOverrides::default());
    }
}
