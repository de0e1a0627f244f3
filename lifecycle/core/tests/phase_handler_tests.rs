// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the phase state machine with scripted phase work.

mod common;

use async_trait::async_trait;
use common::*;
use keptn_lifecycle_api::app::KeptnAppVersion;
use keptn_lifecycle_api::phase::{APP_PIPELINE, APP_PRE_DEPLOYMENT_TASKS};
use keptn_lifecycle_api::{CheckDefinitions, KeptnState};
use keptn_lifecycle_core::application::{PhaseHandler, PhaseWork};
use keptn_lifecycle_core::domain::errors::EngineError;
use keptn_lifecycle_core::domain::events::{EventReason, EventType};
use keptn_lifecycle_core::domain::phase_item::{PhaseItem, PhaseItemWrapper};
use keptn_lifecycle_core::domain::reconcile::ReconcileAction;
use keptn_lifecycle_core::domain::repository::StoreError;
use opentelemetry::trace::{Status, TraceContextExt, Tracer};
use opentelemetry::Context;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Phase work returning a fixed verdict and counting its invocations.
struct Scripted {
    verdict: Result<KeptnState, ()>,
    calls: AtomicUsize,
}

impl Scripted {
    fn new(verdict: KeptnState) -> Self {
        Self {
            verdict: Ok(verdict),
            calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            verdict: Err(()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhaseWork for Scripted {
    async fn reconcile(&self, _item: &mut PhaseItemWrapper, _phase_cx: &Context) -> Result<KeptnState, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdict
            .map_err(|_| EngineError::Store(StoreError::Backend("connection reset".to_string())))
    }
}

fn stored_item(h: &Harness) -> PhaseItemWrapper {
    let version = app_version("0.1.0", CheckDefinitions::default(), vec![]);
    h.store.inner.insert_as(version.clone());
    PhaseItemWrapper::from(version)
}

#[tokio::test]
async fn test_failed_phase_cancels_later_phases_without_running_them() {
    let h = Harness::new();
    let handler = PhaseHandler::new(h.ctx.clone());
    let mut item = stored_item(&h);
    let works: Vec<Scripted> = APP_PIPELINE
        .iter()
        .enumerate()
        .map(|(idx, _)| Scripted::new(if idx == 0 { KeptnState::Failed } else { KeptnState::Succeeded }))
        .collect();

    let mut results = Vec::new();
    for (phase, work) in APP_PIPELINE.iter().zip(&works) {
        results.push(handler.handle_phase(&Context::new(), &mut item, phase, work).await.unwrap());
    }

    assert_eq!(works[0].calls(), 1);
    assert!(works[1..].iter().all(|work| work.calls() == 0));
    assert!(results.iter().all(|r| !r.proceed && r.action == ReconcileAction::Done));

    let stored: KeptnAppVersion = h.store.inner.snapshot(NS, item.name()).unwrap();
    assert_eq!(stored.status.status, KeptnState::Failed);
    assert_eq!(stored.status.pre_deployment_status, KeptnState::Failed);
    assert_eq!(stored.status.pre_deployment_evaluation_status, KeptnState::Cancelled);
    assert_eq!(stored.status.workload_overall_status, KeptnState::Cancelled);
    assert_eq!(stored.status.post_deployment_status, KeptnState::Cancelled);
    assert_eq!(stored.status.post_deployment_evaluation_status, KeptnState::Cancelled);
    assert!(stored.status.end_time.is_some());
}

#[tokio::test]
async fn test_unfinished_phase_requeues_as_progressing() {
    let h = Harness::new();
    let handler = PhaseHandler::new(h.ctx.clone());
    let mut item = stored_item(&h);
    let mut events = h.bus.subscribe();

    let result = handler
        .handle_phase(&Context::new(), &mut item, &APP_PRE_DEPLOYMENT_TASKS, &Scripted::new(KeptnState::Pending))
        .await
        .unwrap();

    assert!(!result.proceed);
    assert_eq!(result.action, ReconcileAction::RequeueAfter(Duration::from_secs(5)));

    let stored: KeptnAppVersion = h.store.inner.snapshot(NS, item.name()).unwrap();
    assert_eq!(stored.status.status, KeptnState::Progressing);
    assert_eq!(stored.status.pre_deployment_status, KeptnState::Progressing);
    assert_eq!(stored.status.current_phase, APP_PRE_DEPLOYMENT_TASKS.short_name);
    assert!(stored.status.phase_trace_ids.contains_key(APP_PRE_DEPLOYMENT_TASKS.short_name));

    let events = events.drain();
    assert_eq!(count_reason(&events, EventReason::Started), 1);
    assert_eq!(count_reason(&events, EventReason::NotFinished), 1);
    assert!(h.spans.is_bound(&item, APP_PRE_DEPLOYMENT_TASKS.short_name));
}

#[tokio::test]
async fn test_succeeded_phase_proceeds_and_closes_span() {
    let h = Harness::new();
    let handler = PhaseHandler::new(h.ctx.clone());
    let mut item = stored_item(&h);

    let result = handler
        .handle_phase(&Context::new(), &mut item, &APP_PRE_DEPLOYMENT_TASKS, &Scripted::new(KeptnState::Succeeded))
        .await
        .unwrap();

    assert!(result.proceed);
    assert_eq!(item.phase_state(&APP_PRE_DEPLOYMENT_TASKS), Some(KeptnState::Succeeded));
    assert!(!h.spans.is_bound(&item, APP_PRE_DEPLOYMENT_TASKS.short_name));
    assert_eq!(h.spans.unbind_count(&item, APP_PRE_DEPLOYMENT_TASKS.short_name), 1);
}

#[tokio::test]
async fn test_work_error_leaves_entity_untouched() {
    let h = Harness::new();
    let handler = PhaseHandler::new(h.ctx.clone());
    let mut item = stored_item(&h);
    let mut events = h.bus.subscribe();

    let err = handler
        .handle_phase(&Context::new(), &mut item, &APP_PRE_DEPLOYMENT_TASKS, &Scripted::failing())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::PhaseReconcile { .. }));
    assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));

    let stored: KeptnAppVersion = h.store.inner.snapshot(NS, item.name()).unwrap();
    assert_eq!(stored.status.current_phase, "");
    assert_eq!(stored.status.status, KeptnState::Pending);

    let warning = events
        .drain()
        .into_iter()
        .find(|e| e.reason == EventReason::ReconcileError)
        .unwrap();
    assert_eq!(warning.event_type, EventType::Warning);
}

#[tokio::test]
async fn test_work_error_marks_entity_span() {
    let h = Harness::new();
    let handler = PhaseHandler::new(h.ctx.clone());
    let mut item = stored_item(&h);

    let tracer = h.ctx.tracer.tracer();
    let span = tracer.span_builder("podtato-0.1.0").start_with_context(tracer, &Context::new());
    let entity_cx = Context::new().with_span(span);

    handler
        .handle_phase(&entity_cx, &mut item, &APP_PRE_DEPLOYMENT_TASKS, &Scripted::failing())
        .await
        .unwrap_err();
    entity_cx.span().end();

    let finished = h.exporter.get_finished_spans().unwrap();
    let entity = finished.iter().find(|s| s.name == "podtato-0.1.0").unwrap();
    assert!(matches!(entity.status, Status::Error { ref description } if description.contains("connection reset")));
    assert!(entity
        .events
        .iter()
        .any(|e| e.name.contains("could not get reconciled")));
}

#[tokio::test]
async fn test_deprecated_entity_is_skipped() {
    let h = Harness::new();
    let handler = PhaseHandler::new(h.ctx.clone());
    let mut item = stored_item(&h);
    item.set_state(KeptnState::Deprecated);
    let work = Scripted::new(KeptnState::Succeeded);

    let result = handler
        .handle_phase(&Context::new(), &mut item, &APP_PRE_DEPLOYMENT_TASKS, &work)
        .await
        .unwrap();

    assert!(!result.proceed);
    assert_eq!(result.action, ReconcileAction::Done);
    assert_eq!(work.calls(), 0);
    assert_eq!(item.current_phase(), "");
}
