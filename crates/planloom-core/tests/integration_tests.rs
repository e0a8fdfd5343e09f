//! End-to-end tests across the extraction, storage, conflict-detection,
//! and scoring layers.

use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;

use planloom_core::domain::conflicts::{ConflictDetector, ConflictType, Severity};
use planloom_core::domain::extraction::{
    AgentRecord, FeatureRecord, PlanRecord, StaticPlanSource, TaskStatus,
};
use planloom_core::domain::graph::{EntityType, GraphStore, RelationType};
use planloom_core::domain::reindex::{ReindexDriver, ReindexOptions};
use planloom_core::domain::scoring::ScoringEngine;
use planloom_core::infrastructure::graph::SqliteGraphStore;
use planloom_core::storage::run_migrations;

async fn setup_store() -> Arc<SqliteGraphStore> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test pool");
    run_migrations(&pool).await.expect("Failed to run migrations");
    Arc::new(SqliteGraphStore::new(pool))
}

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

fn plan(plan_id: &str, plan_number: u32, agents: Vec<AgentRecord>) -> PlanRecord {
    PlanRecord {
        plan_id: plan_id.into(),
        plan_number,
        name: format!("Plan {}", plan_id),
        path: Some(format!("plans/{}", plan_id)),
        status: None,
        overrides: None,
        agents,
        features: vec![],
    }
}

#[tokio::test]
async fn reindexing_twice_yields_identical_graph_contents() {
    let store = setup_store().await;
    let driver = ReindexDriver::new(store.clone());

    let mut worker = agent(1, TaskStatus::Gap);
    worker.dependencies = vec!["001#000".into()];
    worker.files_touched = vec!["src/lib.rs".into(), "src/api.rs".into()];
    let source = StaticPlanSource::new(vec![plan(
        "001",
        1,
        vec![agent(0, TaskStatus::Pass), worker],
    )]);

    let first = driver
        .reindex(&source, &ReindexOptions::default())
        .await
        .unwrap();
    let entities = store.count_entities().await.unwrap();
    let relationships = store.count_relationships().await.unwrap();

    let second = driver
        .reindex(&source, &ReindexOptions::default())
        .await
        .unwrap();

    assert_eq!(first.plans_processed, second.plans_processed);
    assert_eq!(store.count_entities().await.unwrap(), entities);
    assert_eq!(store.count_relationships().await.unwrap(), relationships);
}

#[tokio::test]
async fn local_ids_resolve_within_their_own_plan_only() {
    // Both plans produce local ids 1 (plan) and 2 (agent) in their own
    // batches; the CONTAINS edges must stay inside each plan.
    let store = setup_store().await;
    let driver = ReindexDriver::new(store.clone());
    let source = StaticPlanSource::new(vec![
        plan("A", 1, vec![agent(0, TaskStatus::Gap)]),
        plan("B", 2, vec![agent(0, TaskStatus::Gap)]),
    ]);

    driver
        .reindex(&source, &ReindexOptions::default())
        .await
        .unwrap();

    let contains = store
        .relationships_by_type(RelationType::Contains)
        .await
        .unwrap();
    assert_eq!(contains.len(), 2);

    for plan_id in ["A", "B"] {
        let plan_entity = store
            .entity_by_canonical_id(&format!("plan:{}", plan_id))
            .await
            .unwrap()
            .unwrap();
        let agent_entity = store
            .entity_by_canonical_id(&format!("agent:{}#000", plan_id))
            .await
            .unwrap()
            .unwrap();
        assert!(
            contains
                .iter()
                .any(|r| r.source_id == plan_entity.id && r.target_id == agent_entity.id),
            "plan {} must contain its own agent",
            plan_id
        );
    }
}

#[tokio::test]
async fn reindexed_graph_feeds_conflict_detection() {
    let store = setup_store().await;
    let driver = ReindexDriver::new(store.clone());

    let make_wip = |files: Vec<String>| {
        let mut a = agent(0, TaskStatus::Wip);
        a.files_touched = files;
        a
    };
    let source = StaticPlanSource::new(vec![
        plan("001", 1, vec![make_wip(vec!["src/shared.rs".into()])]),
        plan("002", 2, vec![make_wip(vec!["src/shared.rs".into()])]),
    ]);

    driver
        .reindex(&source, &ReindexOptions::default())
        .await
        .unwrap();

    let detector = ConflictDetector::new(store);
    let reports = detector.detect_all().await.unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].conflict_type, ConflictType::FileContention);
    assert_eq!(reports[0].severity, Severity::Error);
    assert!(
        reports[0]
            .affected_entities
            .contains(&"file:src/shared.rs".to_string())
    );
}

#[tokio::test]
async fn cross_plan_feature_similarity_becomes_overlap_warning() {
    let store = setup_store().await;
    let driver = ReindexDriver::new(store.clone());

    let feature = |id: &str, title: &str| FeatureRecord {
        feature_id: id.into(),
        title: title.into(),
        description: None,
    };
    let mut plan_a = plan("001", 1, vec![]);
    plan_a.features = vec![feature("auth", "user session management")];
    let mut plan_b = plan("002", 2, vec![]);
    plan_b.features = vec![feature("sessions", "user session management")];
    let source = StaticPlanSource::new(vec![plan_a, plan_b]);

    driver
        .reindex(&source, &ReindexOptions::default())
        .await
        .unwrap();

    let detector = ConflictDetector::new(store);
    let reports = detector.detect_feature_overlap().await.unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].severity, Severity::Warning);
}

#[tokio::test]
async fn dependency_cycle_across_reindex_is_reported() {
    let store = setup_store().await;
    let driver = ReindexDriver::new(store.clone());

    let mut a = agent(0, TaskStatus::Gap);
    a.dependencies = vec!["001#001".into()];
    let mut b = agent(1, TaskStatus::Gap);
    b.dependencies = vec!["001#002".into()];
    let mut c = agent(2, TaskStatus::Gap);
    c.dependencies = vec!["001#000".into()];
    let source = StaticPlanSource::new(vec![plan("001", 1, vec![a, b, c])]);

    driver
        .reindex(&source, &ReindexOptions::default())
        .await
        .unwrap();

    let detector = ConflictDetector::new(store);
    let reports = detector.detect_circular_dependencies().await.unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].conflict_type, ConflictType::CircularDependency);
    assert_eq!(reports[0].affected_entities.len(), 3);
}

#[tokio::test]
async fn extraction_failures_do_not_stop_other_plans() {
    let store = setup_store().await;
    let driver = ReindexDriver::new(store.clone());

    // Plan 001 carries an unresolvable dependency; plan 002 is clean
    let mut broken = agent(0, TaskStatus::Gap);
    broken.dependencies = vec!["not a dependency".into()];
    let source = StaticPlanSource::new(vec![
        plan("001", 1, vec![broken]),
        plan("002", 2, vec![agent(0, TaskStatus::Gap)]),
    ]);

    let report = driver
        .reindex(&source, &ReindexOptions::default())
        .await
        .unwrap();

    assert_eq!(report.plans_processed, 2);
    assert_eq!(report.warnings.len(), 1);
    assert!(
        store
            .entity_by_canonical_id("plan:002")
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn graph_agents_carry_status_for_scoring_surfaces() {
    let store = setup_store().await;
    let driver = ReindexDriver::new(store.clone());

    let mut wip = agent(0, TaskStatus::Wip);
    wip.persona = Some("backend".into());
    let source = StaticPlanSource::new(vec![plan("001", 1, vec![wip])]);

    driver
        .reindex(&source, &ReindexOptions::default())
        .await
        .unwrap();

    let agents = store.entities_by_type(EntityType::Agent).await.unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0].status(), Some("WIP"));
    assert_eq!(agents[0].metadata_str("persona"), Some("backend"));
}

#[test]
fn scoring_selects_unblocked_work_deterministically() {
    let mut done = agent(0, TaskStatus::Pass);
    done.files_touched = vec!["src/a.rs".into()];
    let mut next = agent(1, TaskStatus::Gap);
    next.dependencies = vec!["001#000".into()];
    let mut blocked = agent(2, TaskStatus::Gap);
    blocked.dependencies = vec!["001#005".into()];

    let plans = [plan("001", 1, vec![done, next, blocked])];
    let engine = ScoringEngine::default();

    let report = engine.score_plans(&plans, None).unwrap();

    // Only the satisfied-dependency task scores; the blocked one is absent
    assert_eq!(report.breakdowns.len(), 1);
    assert_eq!(report.breakdowns[0].task_id, "001#001");
    assert_eq!(report.breakdowns[0].dependency_score, 40.0);

    let selected = engine.select_next_task(&report.breakdowns).unwrap();
    assert_eq!(selected.task_id, "001#001");

    // Identical inputs select identically
    let again = engine.score_plans(&plans, None).unwrap();
    assert_eq!(again.breakdowns[0].total_score, report.breakdowns[0].total_score);
}
