//! Task scoring, eligibility, and selection
//!
//! Eligibility is a binary gate: a task scores only if its status is `GAP`
//! and every dependency has reached `PASS`. Ineligible tasks are absent
//! from results entirely rather than scored at zero. Scoring itself is
//! deterministic, so identical inputs always produce identical selections.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::extraction::{PlanRecord, TaskStatus};
use crate::error::{Error, Result};

use super::config::{ScoringBiases, ScoringConfig, ScoringOverrides, ScoringProfile, ScoringWeights};

/// Ordinal steps until the priority term reaches zero
const PRIORITY_STEPS_TO_ZERO: f32 = 10.0;

/// Files touched until the workload term reaches zero
const WORKLOAD_STEPS_TO_ZERO: f32 = 6.0;

/// One candidate unit of work: an agent record within a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Task id, `{planId}#{NNN}`
    pub task_id: String,
    /// Owning plan id
    pub plan_id: String,
    /// Numeric plan number, used for deterministic tie-breaks
    pub plan_number: u32,
    /// Ordinal of the agent within its plan
    pub ordinal: u32,
    /// Lifecycle status
    pub status: TaskStatus,
    /// Persona assigned to the agent
    pub persona: Option<String>,
    /// Task ids this task depends on
    pub dependencies: Vec<String>,
    /// Files the task touches
    pub files_touched: Vec<String>,
    /// Raw plan-frontmatter scoring overrides
    pub plan_overrides: Option<Value>,
    /// Raw agent-frontmatter scoring overrides
    pub agent_overrides: Option<Value>,
}

impl TaskRecord {
    /// Build the task records for every agent in a plan
    pub fn from_plan(plan: &PlanRecord) -> Vec<TaskRecord> {
        plan.agents
            .iter()
            .map(|agent| TaskRecord {
                task_id: agent.task_id(&plan.plan_id),
                plan_id: plan.plan_id.clone(),
                plan_number: plan.plan_number,
                ordinal: agent.ordinal,
                status: agent.status,
                persona: agent.persona.clone(),
                dependencies: agent.dependencies.clone(),
                files_touched: agent.files_touched.clone(),
                plan_overrides: plan.overrides.clone(),
                agent_overrides: agent.overrides.clone(),
            })
            .collect()
    }
}

/// How one eligible task scored, term by term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub task_id: String,
    pub plan_id: String,
    pub plan_number: u32,
    pub ordinal: u32,
    /// Always the configured dependency maximum for a scored task
    pub dependency_score: f32,
    /// Linear decay by agent ordinal, floored at zero
    pub priority_score: f32,
    /// Linear decay by files touched, floored at zero
    pub workload_score: f32,
    /// Additive bias contributions by plan, persona, and status
    pub bias_score: f32,
    /// Sum of the terms, floored at zero (no ceiling)
    pub total_score: f32,
}

/// Scored candidates plus any degraded-input warnings
#[derive(Debug, Clone, Default)]
pub struct ScoringReport {
    /// Eligible tasks, best candidate first
    pub breakdowns: Vec<ScoreBreakdown>,
    /// Warnings from unparsable overrides or unknown presets
    pub warnings: Vec<String>,
}

/// Scores tasks and selects the next one to work on
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    weights: ScoringWeights,
    biases: ScoringBiases,
    presets: HashMap<String, ScoringProfile>,
}

impl ScoringEngine {
    /// Create an engine with explicit weights and biases
    pub fn new(weights: ScoringWeights, biases: ScoringBiases) -> Self {
        Self {
            weights,
            biases,
            presets: HashMap::new(),
        }
    }

    /// Create an engine from a scoring configuration, presets included
    pub fn from_config(config: &ScoringConfig) -> Self {
        Self {
            weights: config.weights,
            biases: config.biases.clone(),
            presets: config.presets.clone(),
        }
    }

    /// Register named presets selectable from overrides
    pub fn with_presets(mut self, presets: HashMap<String, ScoringProfile>) -> Self {
        self.presets = presets;
        self
    }

    /// Whether the task may be worked on now
    ///
    /// True iff the status is `GAP` and every dependency resolves to a task
    /// whose status is `PASS`. A dependency naming no known task leaves the
    /// task ineligible.
    pub fn is_eligible(&self, task: &TaskRecord, all_tasks: &[TaskRecord]) -> bool {
        if task.status != TaskStatus::Gap {
            return false;
        }

        task.dependencies.iter().all(|dependency| {
            all_tasks
                .iter()
                .find(|t| t.task_id == *dependency)
                .is_some_and(|t| t.status == TaskStatus::Pass)
        })
    }

    /// Score one task against the full candidate set
    ///
    /// Returns `None` for an ineligible task; that is an ordinary outcome,
    /// not an error. Warnings about unparsable overrides are appended to
    /// `warnings` and logged; the affected level simply contributes nothing.
    pub fn score_task(
        &self,
        task: &TaskRecord,
        all_tasks: &[TaskRecord],
        warnings: &mut Vec<String>,
    ) -> Option<ScoreBreakdown> {
        if !self.is_eligible(task, all_tasks) {
            return None;
        }

        let (weights, biases) = self.effective_config(task, warnings);

        // The gate already proved the dependencies are satisfied, so this
        // term is always its configured maximum for any scored task.
        let dependency_score = weights.dependency;
        let priority_score = linear_decay(weights.priority, task.ordinal as f32, PRIORITY_STEPS_TO_ZERO);
        let workload_score = linear_decay(
            weights.workload,
            task.files_touched.len() as f32,
            WORKLOAD_STEPS_TO_ZERO,
        );
        let bias_score = self.bias_for(task, &biases);

        let total_score =
            (dependency_score + priority_score + workload_score + bias_score).max(0.0);

        debug!(
            task_id = %task.task_id,
            dependency = dependency_score,
            priority = priority_score,
            workload = workload_score,
            bias = bias_score,
            total = total_score,
            "Task scored"
        );

        Some(ScoreBreakdown {
            task_id: task.task_id.clone(),
            plan_id: task.plan_id.clone(),
            plan_number: task.plan_number,
            ordinal: task.ordinal,
            dependency_score,
            priority_score,
            workload_score,
            bias_score,
            total_score,
        })
    }

    /// Score one task looked up by id
    ///
    /// Distinguishes an unknown id ([`Error::TaskNotFound`]) from a known
    /// but ineligible task (`Ok(None)`).
    pub fn score_task_by_id(
        &self,
        task_id: &str,
        all_tasks: &[TaskRecord],
        warnings: &mut Vec<String>,
    ) -> Result<Option<ScoreBreakdown>> {
        let task = all_tasks
            .iter()
            .find(|t| t.task_id == task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;

        Ok(self.score_task(task, all_tasks, warnings))
    }

    /// Score every eligible task across the given plans
    ///
    /// Results come back best candidate first. An unknown `plan_filter` is
    /// [`Error::PlanNotFound`]; a filter that matches but yields no eligible
    /// tasks is an empty report.
    pub fn score_plans(
        &self,
        plans: &[PlanRecord],
        plan_filter: Option<&str>,
    ) -> Result<ScoringReport> {
        if let Some(plan_id) = plan_filter {
            if !plans.iter().any(|p| p.plan_id == plan_id) {
                return Err(Error::PlanNotFound(plan_id.to_string()));
            }
        }

        let all_tasks: Vec<TaskRecord> = plans.iter().flat_map(TaskRecord::from_plan).collect();

        let mut report = ScoringReport::default();
        for task in &all_tasks {
            if plan_filter.is_some_and(|plan_id| task.plan_id != plan_id) {
                continue;
            }
            if let Some(breakdown) = self.score_task(task, &all_tasks, &mut report.warnings) {
                report.breakdowns.push(breakdown);
            }
        }

        report.breakdowns.sort_by(selection_order);
        Ok(report)
    }

    /// Pick the best candidate from scored breakdowns
    ///
    /// Highest total wins; ties break by ascending plan number, then by
    /// ascending agent ordinal, so repeated runs agree.
    pub fn select_next_task<'a>(
        &self,
        candidates: &'a [ScoreBreakdown],
    ) -> Option<&'a ScoreBreakdown> {
        candidates.iter().min_by(|a, b| selection_order(a, b))
    }

    /// Score the plans and select the next task in one call
    pub fn next_task(
        &self,
        plans: &[PlanRecord],
        plan_filter: Option<&str>,
    ) -> Result<(Option<ScoreBreakdown>, Vec<String>)> {
        let report = self.score_plans(plans, plan_filter)?;
        let selected = self.select_next_task(&report.breakdowns).cloned();
        Ok((selected, report.warnings))
    }

    /// Resolve the override cascade for one task
    ///
    /// Order is config, then plan frontmatter, then agent frontmatter; each
    /// level overlays only what it defines. An unparsable level contributes
    /// nothing beyond a warning.
    fn effective_config(
        &self,
        task: &TaskRecord,
        warnings: &mut Vec<String>,
    ) -> (ScoringWeights, ScoringBiases) {
        let mut weights = self.weights;
        let mut biases = self.biases.clone();

        let levels = [
            ("plan", &task.plan_overrides),
            ("agent", &task.agent_overrides),
        ];
        for (level, raw) in levels {
            let Some(value) = raw else { continue };

            let overrides = match ScoringOverrides::from_value(value) {
                Ok(overrides) => overrides,
                Err(e) => {
                    warn!(task_id = %task.task_id, level, error = %e, "Ignoring unparsable scoring overrides");
                    warnings.push(format!("{} overrides for {}: {}", level, task.task_id, e));
                    continue;
                }
            };

            if let Some(preset_name) = &overrides.preset {
                match self.presets.get(preset_name) {
                    Some(profile) => {
                        weights = weights.overlaid_with(&profile.weights);
                        biases = biases.merged_with(&profile.biases);
                    }
                    None => {
                        warn!(task_id = %task.task_id, preset = %preset_name, "Unknown scoring preset");
                        warnings.push(format!(
                            "{} overrides for {}: unknown preset '{}'",
                            level, task.task_id, preset_name
                        ));
                    }
                }
            }
            if let Some(partial) = &overrides.weights {
                weights = weights.overlaid_with(partial);
            }
            if let Some(overlay) = &overrides.biases {
                biases = biases.merged_with(overlay);
            }
        }

        (weights, biases)
    }

    /// Sum every bias matching the task: by plan id, persona, and status
    fn bias_for(&self, task: &TaskRecord, biases: &ScoringBiases) -> f32 {
        let mut bias = 0.0;
        if let Some(value) = biases.plans.get(&task.plan_id) {
            bias += value;
        }
        if let Some(persona) = &task.persona {
            if let Some(value) = biases.personas.get(persona) {
                bias += value;
            }
        }
        if let Some(value) = biases.statuses.get(task.status.as_str()) {
            bias += value;
        }
        bias
    }
}

/// Linear decay from `max` to zero over `steps_to_zero` steps
fn linear_decay(max: f32, steps: f32, steps_to_zero: f32) -> f32 {
    (max - steps * (max / steps_to_zero)).max(0.0)
}

/// Total order used for ranking: best candidate first
fn selection_order(a: &ScoreBreakdown, b: &ScoreBreakdown) -> Ordering {
    b.total_score
        .partial_cmp(&a.total_score)
        .unwrap_or(Ordering::Equal)
        .then(a.plan_number.cmp(&b.plan_number))
        .then(a.ordinal.cmp(&b.ordinal))
}
