// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for task and evaluation fan-out.
//!
//! Each test drives `RunHandler` passes against the in-memory store and
//! inspects the returned status lists, the store's read/create counters,
//! the emitted notifications and the span cache.

mod common;

use common::*;
use keptn_lifecycle_api::app::KeptnAppVersion;
use keptn_lifecycle_api::evaluation::KeptnEvaluation;
use keptn_lifecycle_api::task::KeptnTask;
use keptn_lifecycle_api::{CheckDefinitions, CheckType, ItemStatus, KeptnState, StatusSummary};
use keptn_lifecycle_core::application::evaluation_handler::EvaluationRuns;
use keptn_lifecycle_core::application::task_handler::TaskRuns;
use keptn_lifecycle_core::application::RunHandler;
use keptn_lifecycle_core::domain::errors::EngineError;
use keptn_lifecycle_core::domain::events::EventReason;
use keptn_lifecycle_core::domain::object::ObjectKind;
use keptn_lifecycle_core::domain::phase_item::{PhaseItem, PhaseItemWrapper};
use keptn_lifecycle_core::domain::repository::StoreError;
use opentelemetry::Context;

fn pre_evaluations(names: &[&str]) -> CheckDefinitions {
    CheckDefinitions {
        pre_deployment_evaluations: names.iter().map(|n| n.to_string()).collect(),
        ..Default::default()
    }
}

fn pre_tasks(names: &[&str]) -> CheckDefinitions {
    CheckDefinitions {
        pre_deployment_tasks: names.iter().map(|n| n.to_string()).collect(),
        ..Default::default()
    }
}

fn stored_item(h: &Harness, checks: CheckDefinitions) -> PhaseItemWrapper {
    let version = app_version("0.1.0", checks, vec![]);
    h.store.inner.insert_as(version.clone());
    PhaseItemWrapper::from(version)
}

#[tokio::test]
async fn test_no_configured_evaluations_creates_nothing() {
    let h = Harness::new();
    let item = stored_item(&h, CheckDefinitions::default());
    let handler = RunHandler::<EvaluationRuns>::new(h.ctx.clone());

    let (statuses, summary) = handler
        .reconcile(&Context::new(), &item, CheckType::PreDeploymentEvaluation)
        .await
        .unwrap();

    assert!(statuses.is_empty());
    assert_eq!(summary, StatusSummary::default());
    assert_eq!(h.store.creates(ObjectKind::Evaluation), 0);
}

#[tokio::test]
async fn test_new_evaluation_is_created_once_pending() {
    let h = Harness::new();
    h.store.inner.insert_as(evaluation_definition(NS, "eval-def"));
    let item = stored_item(&h, pre_evaluations(&["eval-def"]));
    let handler = RunHandler::<EvaluationRuns>::new(h.ctx.clone());

    let (statuses, summary) = handler
        .reconcile(&Context::new(), &item, CheckType::PreDeploymentEvaluation)
        .await
        .unwrap();

    assert_eq!(statuses.len(), 1);
    assert!(statuses[0].name.starts_with("pre-eval-eval-def-"));
    assert_eq!(statuses[0].status, KeptnState::Pending);
    assert!(statuses[0].start_time.is_some());
    assert_eq!(summary.total, 1);
    assert_eq!(summary.pending, 1);
    assert_eq!(summary.counted(), 1);
    assert_eq!(h.store.creates(ObjectKind::Evaluation), 1);

    let run: KeptnEvaluation = h.store.inner.snapshot(NS, &statuses[0].name).unwrap();
    assert_eq!(run.spec.evaluation_definition, "eval-def");
    assert_eq!(run.spec.check_type, CheckType::PreDeploymentEvaluation);
    assert!(run.spec.trace_context.contains_key("traceparent"));
}

#[tokio::test]
async fn test_repeated_pass_reuses_recorded_run() {
    let h = Harness::new();
    h.store.inner.insert_as(evaluation_definition(NS, "eval-def"));
    let mut item = stored_item(&h, pre_evaluations(&["eval-def"]));
    let handler = RunHandler::<EvaluationRuns>::new(h.ctx.clone());

    handler
        .reconcile_phase(&Context::new(), &mut item, CheckType::PreDeploymentEvaluation)
        .await
        .unwrap();
    let state = handler
        .reconcile_phase(&Context::new(), &mut item, CheckType::PreDeploymentEvaluation)
        .await
        .unwrap();

    assert_eq!(state, KeptnState::Pending);
    assert_eq!(h.store.creates(ObjectKind::Evaluation), 1);
    assert_eq!(h.store.inner.count(ObjectKind::Evaluation), 1);

    // the run reference was persisted on the entity
    let stored: KeptnAppVersion = h.store.inner.snapshot(NS, item.name()).unwrap();
    assert_eq!(
        stored.status.runs.pre_deployment_evaluation_task_status,
        item.run_statuses(CheckType::PreDeploymentEvaluation)
    );
}

#[tokio::test]
async fn test_succeeded_run_is_never_fetched_again() {
    let h = Harness::new();
    let mut item = stored_item(&h, pre_evaluations(&["eval-def"]));
    item.set_run_statuses(
        CheckType::PreDeploymentEvaluation,
        vec![ItemStatus {
            definition_name: "eval-def".to_string(),
            name: "pre-eval-eval-def-12345".to_string(),
            status: KeptnState::Succeeded,
            ..Default::default()
        }],
    );
    let handler = RunHandler::<EvaluationRuns>::new(h.ctx.clone());
    let mut events = h.bus.subscribe();

    let (statuses, summary) = handler
        .reconcile(&Context::new(), &item, CheckType::PreDeploymentEvaluation)
        .await
        .unwrap();

    assert_eq!(statuses[0].status, KeptnState::Succeeded);
    assert_eq!(summary.total, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(h.store.gets(ObjectKind::Evaluation), 0);
    assert_eq!(h.store.creates(ObjectKind::Evaluation), 0);
    let events = events.drain();
    assert_eq!(count_reason(&events, EventReason::StatusChanged), 0);
    assert_eq!(count_reason(&events, EventReason::NotFinished), 0);
}

#[tokio::test]
async fn test_failed_run_reported_once_and_span_unbound_once() {
    let h = Harness::new();
    h.store.inner.insert_as(task_definition(NS, "smoke"));
    let mut item = stored_item(&h, pre_tasks(&["smoke"]));
    let handler = RunHandler::<TaskRuns>::new(h.ctx.clone());
    let mut events = h.bus.subscribe();

    handler
        .reconcile_phase(&Context::new(), &mut item, CheckType::PreDeployment)
        .await
        .unwrap();
    let run_name = item.run_statuses(CheckType::PreDeployment)[0].name.clone();
    assert!(run_name.starts_with("pre-smoke-"));
    events.drain();

    let mut task: KeptnTask = h.store.inner.snapshot(NS, &run_name).unwrap();
    task.status.status = KeptnState::Failed;
    task.status.message = "exit code 1".to_string();
    h.store.inner.insert_as(task.clone());

    let state = handler
        .reconcile_phase(&Context::new(), &mut item, CheckType::PreDeployment)
        .await
        .unwrap();
    assert_eq!(state, KeptnState::Failed);
    assert_eq!(h.spans.unbind_count(&task, ""), 1);
    assert!(!h.spans.is_bound(&task, ""));

    let changed = events.drain();
    assert_eq!(count_reason(&changed, EventReason::StatusChanged), 1);
    let failure = changed
        .iter()
        .find(|e| e.reason == EventReason::Failed)
        .unwrap();
    assert_eq!(failure.involved.name, run_name);
    assert!(failure.message.contains("exit code 1"));

    // a later pass only carries the terminal status over
    let state = handler
        .reconcile_phase(&Context::new(), &mut item, CheckType::PreDeployment)
        .await
        .unwrap();
    assert_eq!(state, KeptnState::Failed);
    assert_eq!(h.spans.unbind_count(&task, ""), 1);
    assert_eq!(count_reason(&events.drain(), EventReason::StatusChanged), 0);
}

#[tokio::test]
async fn test_lost_run_is_recreated() {
    let h = Harness::new();
    h.store.inner.insert_as(task_definition(NS, "smoke"));
    let mut item = stored_item(&h, pre_tasks(&["smoke"]));
    item.set_run_statuses(
        CheckType::PreDeployment,
        vec![ItemStatus {
            definition_name: "smoke".to_string(),
            name: "pre-smoke-54321".to_string(),
            status: KeptnState::Progressing,
            ..Default::default()
        }],
    );
    let handler = RunHandler::<TaskRuns>::new(h.ctx.clone());

    let (statuses, _) = handler
        .reconcile(&Context::new(), &item, CheckType::PreDeployment)
        .await
        .unwrap();

    assert_eq!(h.store.creates(ObjectKind::Task), 1);
    assert_ne!(statuses[0].name, "pre-smoke-54321");
    assert_eq!(statuses[0].status, KeptnState::Pending);
}

#[tokio::test]
async fn test_definition_falls_back_to_default_namespace() {
    let h = Harness::new();
    let fallback = h.ctx.config.default_namespace.clone();
    h.store.inner.insert_as(task_definition(&fallback, "smoke"));
    let item = stored_item(&h, pre_tasks(&["smoke"]));
    let handler = RunHandler::<TaskRuns>::new(h.ctx.clone());

    let (statuses, _) = handler
        .reconcile(&Context::new(), &item, CheckType::PreDeployment)
        .await
        .unwrap();

    // runs always live next to the entity
    let run: Option<KeptnTask> = h.store.inner.snapshot(NS, &statuses[0].name);
    assert!(run.is_some());
}

#[tokio::test]
async fn test_missing_definition_aborts_pass() {
    let h = Harness::new();
    let item = stored_item(&h, pre_tasks(&["does-not-exist"]));
    let handler = RunHandler::<TaskRuns>::new(h.ctx.clone());

    let err = handler
        .reconcile(&Context::new(), &item, CheckType::PreDeployment)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::DefinitionNotFound { ref name, .. } if name == "does-not-exist"));
    assert_eq!(h.store.creates(ObjectKind::Task), 0);
}

#[tokio::test]
async fn test_name_collisions_give_up_after_configured_attempts() {
    let h = Harness::new();
    h.store.inner.insert_as(task_definition(NS, "smoke"));
    let item = stored_item(&h, pre_tasks(&["smoke"]));
    let handler = RunHandler::<TaskRuns>::new(h.ctx.clone());
    let mut events = h.bus.subscribe();
    h.store.reject_creates(ObjectKind::Task);

    let err = handler
        .reconcile(&Context::new(), &item, CheckType::PreDeployment)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::NameCollision { ref definition, attempts: 3 } if definition == "smoke"
    ));
    assert_eq!(h.store.creates(ObjectKind::Task), h.ctx.config.max_create_attempts as usize);
    assert_eq!(h.store.inner.count(ObjectKind::Task), 0);
    assert_eq!(count_reason(&events.drain(), EventReason::Failed), 1);
}

#[tokio::test]
async fn test_run_fetch_error_aborts_pass_without_partial_result() {
    let h = Harness::new();
    h.store.inner.insert_as(task_definition(NS, "smoke"));
    h.store.inner.insert_as(task_definition(NS, "load"));
    let mut item = stored_item(&h, pre_tasks(&["smoke", "load"]));
    let handler = RunHandler::<TaskRuns>::new(h.ctx.clone());

    handler
        .reconcile_phase(&Context::new(), &mut item, CheckType::PreDeployment)
        .await
        .unwrap();
    let recorded = item.run_statuses(CheckType::PreDeployment).to_vec();
    assert_eq!(recorded.len(), 2);

    h.store.fail_next_get(ObjectKind::Task);
    let err = handler
        .reconcile_phase(&Context::new(), &mut item, CheckType::PreDeployment)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Store(StoreError::Backend(_))));
    // the failed fetch is not mistaken for a lost run
    assert_eq!(h.store.creates(ObjectKind::Task), 2);
    assert_eq!(h.store.inner.count(ObjectKind::Task), 2);
    assert_eq!(item.run_statuses(CheckType::PreDeployment), recorded.as_slice());
    let stored: KeptnAppVersion = h.store.inner.snapshot(NS, item.name()).unwrap();
    assert_eq!(stored.status.runs.pre_deployment_task_status, recorded);
}
