// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Entity-level span and completion handling shared by the app and workload
//! version reconcilers.

use crate::application::context::EngineContext;
use crate::application::phase_handler::PhaseWork;
use crate::application::run_handler::{RunHandler, RunKind};
use crate::domain::errors::EngineError;
use crate::domain::events::{EventReason, EventType};
use crate::domain::phase_item::{PhaseItem, PhaseItemWrapper};
use crate::domain::reconcile::ReconcileAction;
use async_trait::async_trait;
use keptn_lifecycle_api::phase::PHASE_COMPLETED;
use keptn_lifecycle_api::{CheckType, KeptnPhaseType, KeptnState};
use opentelemetry::trace::{Status, TraceContextExt};
use opentelemetry::Context;
use tracing::info;

/// Task or evaluation phase: fan out runs of one check type.
pub(crate) struct RunPhase<'a, K: RunKind> {
    pub handler: &'a RunHandler<K>,
    pub check_type: CheckType,
}

#[async_trait]
impl<'a, K: RunKind> PhaseWork for RunPhase<'a, K> {
    async fn reconcile(&self, item: &mut PhaseItemWrapper, phase_cx: &Context) -> Result<KeptnState, EngineError> {
        self.handler.reconcile_phase(phase_cx, item, self.check_type).await
    }
}

/// Binds (or reuses) the entity span: parented on the rollout's stored
/// trace context and linked to the traces that triggered the rollout.
pub(crate) fn open_entity_span(ctx: &EngineContext, item: &PhaseItemWrapper, parent: &Context) -> Context {
    let links = item
        .span_links()
        .iter()
        .filter_map(|carrier| ctx.tracer.link_to(carrier))
        .collect();
    let entity_cx = ctx.spans.get_span(parent, item, "", links);
    if item.current_phase().is_empty() {
        entity_cx
            .span()
            .add_event(format!("{} started", item.name()), vec![]);
    }
    entity_cx
}

pub(crate) fn record_entity(ctx: &EngineContext, item: &PhaseItemWrapper) {
    match item {
        PhaseItemWrapper::AppVersion(version) => ctx.meters.record_app_version(version),
        PhaseItemWrapper::WorkloadVersion(version) => ctx.meters.record_workload_version(version),
    }
}

/// Closes the entity span of a failed entity and reports the outcome.
pub(crate) fn close_failed_entity(
    ctx: &EngineContext,
    entity_cx: &Context,
    item: &PhaseItemWrapper,
    completed: &KeptnPhaseType,
) {
    let span = entity_cx.span();
    span.add_event(format!("{} has failed", item.name()), vec![]);
    span.set_status(Status::error("Failed"));
    span.end();
    ctx.spans.unbind_span(item, "");
    ctx.events.emit(
        completed,
        EventType::Warning,
        &item.object_ref(),
        EventReason::Failed,
        "has failed",
        item.version(),
    );
    record_entity(ctx, item);
}

/// Marks the entity succeeded once every phase passed.
pub(crate) async fn finish_entity(
    ctx: &EngineContext,
    entity_cx: &Context,
    item: &mut PhaseItemWrapper,
    completed: &KeptnPhaseType,
) -> Result<ReconcileAction, EngineError> {
    if !item.is_end_time_set() {
        item.set_current_phase(PHASE_COMPLETED.short_name);
        item.set_state(KeptnState::Succeeded);
        item.set_end_time();
    }
    ctx.store.update_status(&item.to_object()).await?;

    info!(entity = %item.name(), version = %item.version(), "Rollout finished");
    ctx.events.emit(
        completed,
        EventType::Normal,
        &item.object_ref(),
        EventReason::Succeeded,
        "has finished",
        item.version(),
    );
    record_entity(ctx, item);

    let span = entity_cx.span();
    span.add_event(format!("{} has finished", item.name()), vec![]);
    span.set_status(Status::Ok);
    span.end();
    ctx.spans.unbind_span(&*item, "");
    Ok(ReconcileAction::Done)
}
