// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Version creation and deprecation of superseded rollouts.

mod common;

use common::*;
use keptn_lifecycle_api::app::{KeptnApp, KeptnAppVersion};
use keptn_lifecycle_api::phase::APP_DEPLOYMENT;
use keptn_lifecycle_api::workload::{KeptnWorkload, KeptnWorkloadVersion};
use keptn_lifecycle_api::{KeptnState, ObjectKey};
use keptn_lifecycle_core::application::ReconcileUseCase;
use keptn_lifecycle_core::domain::events::EventReason;
use keptn_lifecycle_core::domain::object::ObjectKind;
use keptn_lifecycle_core::domain::reconcile::ReconcileAction;
use std::collections::BTreeMap;

fn app_key() -> ObjectKey {
    ObjectKey::new(NS, APP)
}

#[tokio::test]
async fn test_app_version_is_created_once() {
    let h = Harness::new();
    let engine = h.engine();
    let mut events = h.bus.subscribe();
    let mut spec = app("0.1.0", 1, vec![frontend_ref("0.1.0")]);
    spec.metadata.annotations = BTreeMap::from([(
        "traceparent".to_string(),
        "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01".to_string(),
    )]);
    let version_name = spec.app_version_name();
    h.store.inner.insert_as(spec);

    engine.reconcile(ObjectKind::App, &app_key()).await.unwrap();
    engine.reconcile(ObjectKind::App, &app_key()).await.unwrap();

    assert_eq!(h.store.creates(ObjectKind::AppVersion), 1);
    assert_eq!(count_reason(&events.drain(), EventReason::AppVersionCreated), 1);

    let version: KeptnAppVersion = h.store.inner.snapshot(NS, &version_name).unwrap();
    assert_eq!(version.spec.app_name, APP);
    assert_eq!(version.spec.revision, 1);
    assert_eq!(version.spec.previous_version, "");
    assert_eq!(version.spec.app.workloads, vec![frontend_ref("0.1.0")]);
    assert!(version.spec.trace_id.contains_key("traceparent"));
    // fresh trace root, inbound context only linked
    assert_ne!(
        trace_id_of(&version.spec.trace_id["traceparent"]),
        "4bf92f3577b34da6a3ce929d0e0e4736"
    );
    assert_eq!(version.spec.span_links.len(), 1);

    let app: KeptnApp = h.store.inner.snapshot(NS, APP).unwrap();
    assert_eq!(app.status.current_version, "0.1.0");
}

#[tokio::test]
async fn test_new_generation_deprecates_running_version() {
    let h = Harness::new();
    let engine = h.engine();
    let mut events = h.bus.subscribe();

    h.store.inner.insert_as(app("0.1.0", 1, vec![frontend_ref("0.1.0")]));
    engine.reconcile(ObjectKind::App, &app_key()).await.unwrap();
    let first_name = app("0.1.0", 1, vec![]).app_version_name();

    // first rollout is stuck waiting for its workload
    let action = engine
        .reconcile(ObjectKind::AppVersion, &ObjectKey::new(NS, &first_name))
        .await
        .unwrap();
    assert!(matches!(action, ReconcileAction::RequeueAfter(_)));
    let first: KeptnAppVersion = h.store.inner.snapshot(NS, &first_name).unwrap();
    assert!(h.spans.is_bound(&first, ""));
    assert!(h.spans.is_bound(&first, APP_DEPLOYMENT.short_name));

    // user edits the app: generation 2 with a new version
    let mut edited = app("0.2.0", 2, vec![frontend_ref("0.2.0")]);
    edited.status.current_version = "0.1.0".to_string();
    h.store.inner.insert_as(edited.clone());
    engine.reconcile(ObjectKind::App, &app_key()).await.unwrap();

    let first: KeptnAppVersion = h.store.inner.snapshot(NS, &first_name).unwrap();
    assert_eq!(first.status.status, KeptnState::Deprecated);
    assert_eq!(first.status.pre_deployment_status, KeptnState::Succeeded);
    assert_eq!(first.status.pre_deployment_evaluation_status, KeptnState::Succeeded);
    assert_eq!(first.status.workload_overall_status, KeptnState::Deprecated);
    assert_eq!(first.status.post_deployment_status, KeptnState::Deprecated);
    assert_eq!(first.status.post_deployment_evaluation_status, KeptnState::Deprecated);
    assert!(first.status.end_time.is_some());
    assert!(!h.spans.is_bound(&first, ""));
    assert!(!h.spans.is_bound(&first, APP_DEPLOYMENT.short_name));

    let second: KeptnAppVersion = h.store.inner.snapshot(NS, &edited.app_version_name()).unwrap();
    assert_eq!(second.spec.revision, 2);
    assert_eq!(second.spec.previous_version, "0.1.0");
    assert_eq!(second.status.status, KeptnState::Pending);

    let events = events.drain();
    assert_eq!(count_reason(&events, EventReason::AppVersionDeprecated), 1);
    assert_eq!(count_reason(&events, EventReason::AppVersionCreated), 2);

    // the deprecated rollout does not resume
    let action = engine
        .reconcile(ObjectKind::AppVersion, &ObjectKey::new(NS, &first_name))
        .await
        .unwrap();
    assert_eq!(action, ReconcileAction::Done);
}

#[tokio::test]
async fn test_failed_deprecation_is_retried_after_version_exists() {
    let h = Harness::new();
    let engine = h.engine();
    let mut events = h.bus.subscribe();

    h.store.inner.insert_as(app("0.1.0", 1, vec![frontend_ref("0.1.0")]));
    engine.reconcile(ObjectKind::App, &app_key()).await.unwrap();
    let first_name = app("0.1.0", 1, vec![]).app_version_name();

    let mut edited = app("0.2.0", 2, vec![frontend_ref("0.2.0")]);
    edited.status.current_version = "0.1.0".to_string();
    h.store.inner.insert_as(edited.clone());

    // the new version gets created, listing the old ones fails
    h.store.fail_next_list(ObjectKind::AppVersion);
    let err = engine.reconcile(ObjectKind::App, &app_key()).await.unwrap_err();
    assert!(err.to_string().contains("transient"));
    let second: KeptnAppVersion = h.store.inner.snapshot(NS, &edited.app_version_name()).unwrap();
    assert_eq!(second.spec.previous_version, "0.1.0");
    let first: KeptnAppVersion = h.store.inner.snapshot(NS, &first_name).unwrap();
    assert_eq!(first.status.status, KeptnState::Pending);

    let action = engine.reconcile(ObjectKind::App, &app_key()).await.unwrap();
    assert_eq!(action, ReconcileAction::Done);

    let first: KeptnAppVersion = h.store.inner.snapshot(NS, &first_name).unwrap();
    assert_eq!(first.status.status, KeptnState::Deprecated);
    assert_eq!(h.store.creates(ObjectKind::AppVersion), 2);

    let emitted = events.drain();
    assert_eq!(count_reason(&emitted, EventReason::AppVersionCreated), 2);
    assert_eq!(count_reason(&emitted, EventReason::AppVersionDeprecated), 1);

    // nothing left to deprecate on later passes
    engine.reconcile(ObjectKind::App, &app_key()).await.unwrap();
    assert_eq!(count_reason(&events.drain(), EventReason::AppVersionDeprecated), 0);
}

#[tokio::test]
async fn test_finished_versions_are_not_deprecated() {
    let h = Harness::new();
    let engine = h.engine();

    h.store.inner.insert_as(app("0.1.0", 1, vec![]));
    engine.reconcile(ObjectKind::App, &app_key()).await.unwrap();
    let first_name = app("0.1.0", 1, vec![]).app_version_name();
    // no checks and no workloads: the rollout finishes in one pass
    let action = engine
        .reconcile(ObjectKind::AppVersion, &ObjectKey::new(NS, &first_name))
        .await
        .unwrap();
    assert_eq!(action, ReconcileAction::Done);

    let mut edited = app("0.1.0", 2, vec![]);
    edited.status.current_version = "0.1.0".to_string();
    h.store.inner.insert_as(edited);
    engine.reconcile(ObjectKind::App, &app_key()).await.unwrap();

    let first: KeptnAppVersion = h.store.inner.snapshot(NS, &first_name).unwrap();
    assert_eq!(first.status.status, KeptnState::Succeeded);
    assert_eq!(h.store.inner.count(ObjectKind::AppVersion), 2);

    // same version string: the new rollout has no predecessor
    let second: KeptnAppVersion = h
        .store
        .inner
        .snapshot(NS, &app("0.1.0", 2, vec![]).app_version_name())
        .unwrap();
    assert_eq!(second.spec.previous_version, "");
}

#[tokio::test]
async fn test_workload_version_is_created_once_per_version() {
    let h = Harness::new();
    let engine = h.engine();
    let workload_key = ObjectKey::new(NS, "podtato-frontend");
    h.store.inner.insert_as(frontend_workload("0.1.0"));

    engine.reconcile(ObjectKind::Workload, &workload_key).await.unwrap();
    engine.reconcile(ObjectKind::Workload, &workload_key).await.unwrap();
    assert_eq!(h.store.creates(ObjectKind::WorkloadVersion), 1);

    let mut upgraded: KeptnWorkload = h.store.inner.snapshot(NS, "podtato-frontend").unwrap();
    upgraded.spec.version = "0.2.0".to_string();
    h.store.inner.insert_as(upgraded);
    engine.reconcile(ObjectKind::Workload, &workload_key).await.unwrap();

    let version: KeptnWorkloadVersion = h.store.inner.snapshot(NS, "podtato-frontend-0.2.0").unwrap();
    assert_eq!(version.spec.previous_version, "0.1.0");
    assert!(version.spec.trace_id.is_empty());
    let workload: KeptnWorkload = h.store.inner.snapshot(NS, "podtato-frontend").unwrap();
    assert_eq!(workload.status.current_version, "0.2.0");
    assert_eq!(h.store.inner.count(ObjectKind::WorkloadVersion), 2);
}

#[tokio::test]
async fn test_active_gauges_count_unfinished_versions() {
    let h = Harness::new();
    let engine = h.engine();
    h.store.inner.insert_as(app("0.1.0", 1, vec![frontend_ref("0.1.0")]));
    h.store.inner.insert_as(frontend_workload("0.1.0"));
    engine.reconcile(ObjectKind::App, &app_key()).await.unwrap();
    engine
        .reconcile(ObjectKind::Workload, &ObjectKey::new(NS, "podtato-frontend"))
        .await
        .unwrap();

    let counts = engine.collect_active(&[NS.to_string()]).await.unwrap();
    assert_eq!(counts.apps, 1);
    assert_eq!(counts.deployments, 1);
    assert_eq!(counts.tasks, 0);
    assert_eq!(counts.evaluations, 0);
}
