// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Run Fan-Out Handler
//!
//! Reconciles the definition names configured for one check type into child
//! runs and folds their reported states into a [`StatusSummary`].
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Create each run at most once, then mirror its status
//! - **Collaborators:**
//!   - Domain: PhaseItemWrapper, ObjectStore, EventSender, SpanHandler
//!   - Infrastructure: LifecycleTracer, LifecycleMeters
//!
//! A run is created only when the entity holds no reference to one, and the
//! reference is persisted before the next pass; a second pass over the same
//! stored state therefore finds the run instead of creating another.

use crate::application::context::EngineContext;
use crate::domain::errors::EngineError;
use crate::domain::events::{EventReason, EventType};
use crate::domain::object::{ObjectRef, Resource};
use crate::domain::phase_item::{PhaseItem, PhaseItemWrapper};
use crate::domain::repository::StoreExt;
use crate::domain::span::SpanItem;
use crate::infrastructure::telemetry::LifecycleMeters;
use keptn_lifecycle_api::item_status::find_item_status;
use keptn_lifecycle_api::{
    get_overall_state, update_status_summary, CheckType, ItemStatus, KeptnPhaseType, KeptnState,
    ObjectKey, StatusSummary, TraceCarrier,
};
use opentelemetry::trace::{SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry::Context;
use std::marker::PhantomData;
use tracing::{debug, info, warn};

/// One family of child runs (tasks or evaluations).
pub trait RunKind: Send + Sync + 'static {
    type Definition: Resource;
    type Run: Resource + SpanItem;

    /// Lower-case noun used in messages and span names.
    const NOUN: &'static str;

    /// Descriptor used for status notifications about runs.
    const RECONCILE_PHASE: KeptnPhaseType;

    /// Descriptor used for creation notifications.
    const CREATE_PHASE: KeptnPhaseType;

    fn generate(
        item: &PhaseItemWrapper,
        definition: &Self::Definition,
        check_type: CheckType,
        trace_context: TraceCarrier,
    ) -> Self::Run;

    /// State the runner reported on the run.
    fn reported_state(run: &Self::Run) -> KeptnState;

    /// Human-readable reasons for a failed run, one per line.
    fn failure_details(run: &Self::Run) -> Vec<String>;

    fn record(meters: &LifecycleMeters, run: &Self::Run);
}

pub struct RunHandler<K: RunKind> {
    ctx: EngineContext,
    _kind: PhantomData<fn() -> K>,
}

impl<K: RunKind> RunHandler<K> {
    pub fn new(ctx: EngineContext) -> Self {
        Self {
            ctx,
            _kind: PhantomData,
        }
    }

    /// Reconciles every run of `check_type` and returns the new status list
    /// with its summary. The entity itself is not modified.
    ///
    /// Any store failure other than a lost run reference aborts the pass
    /// without a partial result.
    pub async fn reconcile(
        &self,
        phase_cx: &Context,
        item: &PhaseItemWrapper,
        check_type: CheckType,
    ) -> Result<(Vec<ItemStatus>, StatusSummary), EngineError> {
        let definitions = item.definitions(check_type);
        let previous = item.run_statuses(check_type);
        let mut summary = StatusSummary::with_total(definitions.len());
        let mut statuses = Vec::with_capacity(definitions.len());

        for definition_name in definitions {
            let recorded = find_item_status(previous, definition_name);
            let old_state = recorded.map(|s| s.status).unwrap_or_default();
            let mut status = recorded
                .cloned()
                .unwrap_or_else(|| ItemStatus::pending(definition_name.as_str()));

            if status.status.is_completed() {
                summary = update_status_summary(status.status, summary);
                statuses.push(status);
                continue;
            }

            let mut existing = None;
            if status.has_run() {
                let key = ObjectKey::new(item.namespace(), &status.name);
                match self.ctx.store.get_as::<K::Run>(&key).await {
                    Ok(run) => existing = Some(run),
                    Err(e) if e.is_not_found() => {
                        info!(
                            run = %status.name,
                            definition = %definition_name,
                            "{} run disappeared, creating a new one",
                            K::NOUN
                        );
                        status.name.clear();
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            match existing {
                Some(run) => self.observe_run(phase_cx, item, &run, &mut status),
                None => self.create_run(phase_cx, item, definition_name, check_type, &mut status).await?,
            }

            if status.status != old_state {
                self.ctx.events.emit(
                    &K::RECONCILE_PHASE,
                    EventType::Normal,
                    &item.object_ref(),
                    EventReason::StatusChanged,
                    &format!("{} status changed from {} to {}", K::NOUN, old_state, status.status),
                    item.version(),
                );
            }
            summary = update_status_summary(status.status, summary);
            statuses.push(status);
        }

        if !get_overall_state(&summary).is_succeeded() {
            self.ctx.events.emit(
                &K::RECONCILE_PHASE,
                EventType::Normal,
                &item.object_ref(),
                EventReason::NotFinished,
                &format!("{}s not finished", K::NOUN),
                item.version(),
            );
        }
        Ok((statuses, summary))
    }

    /// Runs [`Self::reconcile`], stores the new run list on the entity and
    /// persists it when it changed. Returns the aggregated phase verdict.
    pub async fn reconcile_phase(
        &self,
        phase_cx: &Context,
        item: &mut PhaseItemWrapper,
        check_type: CheckType,
    ) -> Result<KeptnState, EngineError> {
        let (statuses, summary) = self.reconcile(phase_cx, item, check_type).await?;
        if statuses.as_slice() != item.run_statuses(check_type) {
            item.set_run_statuses(check_type, statuses);
            self.ctx.store.update_status(&item.to_object()).await?;
        }
        Ok(get_overall_state(&summary))
    }

    async fn find_definition(&self, namespace: &str, name: &str) -> Result<K::Definition, EngineError> {
        let fallback = self.ctx.config.default_namespace.as_str();
        let mut namespaces = vec![namespace];
        if fallback != namespace {
            namespaces.push(fallback);
        }
        for ns in namespaces {
            match self.ctx.store.get_as::<K::Definition>(&ObjectKey::new(ns, name)).await {
                Ok(definition) => return Ok(definition),
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(EngineError::DefinitionNotFound {
            kind: <K::Definition as Resource>::KIND,
            name: name.to_string(),
            namespace: namespace.to_string(),
            fallback_namespace: fallback.to_string(),
        })
    }

    async fn create_run(
        &self,
        phase_cx: &Context,
        item: &PhaseItemWrapper,
        definition_name: &str,
        check_type: CheckType,
        status: &mut ItemStatus,
    ) -> Result<(), EngineError> {
        let definition = self.find_definition(item.namespace(), definition_name).await?;

        let tracer = self.ctx.tracer.tracer();
        let span = tracer
            .span_builder(format!("create_{}_{}_{}", check_type, item.object_type().as_str(), K::NOUN))
            .with_kind(SpanKind::Producer)
            .with_attributes(item.span_attributes())
            .start_with_context(tracer, phase_cx);
        let create_cx = phase_cx.with_span(span);
        let carrier = self.ctx.tracer.inject(&create_cx);

        let max_attempts = self.ctx.config.max_create_attempts;
        let mut attempts = 0;
        let run = loop {
            attempts += 1;
            let candidate = K::generate(item, &definition, check_type, carrier.clone());
            match self.ctx.store.create_as(candidate).await {
                Ok(run) => break run,
                Err(e) if e.is_already_exists() && attempts < max_attempts => {
                    debug!(definition = %definition_name, attempts, "Run name taken, regenerating");
                }
                Err(e) => {
                    let error = if e.is_already_exists() {
                        EngineError::NameCollision {
                            definition: definition_name.to_string(),
                            attempts,
                        }
                    } else {
                        EngineError::from(e)
                    };
                    let span = create_cx.span();
                    span.set_status(Status::error(error.to_string()));
                    span.end();
                    warn!(definition = %definition_name, error = %error, "Could not create {}", K::NOUN);
                    self.ctx.events.emit(
                        &K::CREATE_PHASE,
                        EventType::Warning,
                        &item.object_ref(),
                        EventReason::Failed,
                        &format!("could not create {}", K::NOUN),
                        item.version(),
                    );
                    return Err(error);
                }
            }
        };

        let span = create_cx.span();
        span.set_status(Status::Ok);
        span.end();

        let run_name = run.metadata().name.clone();
        self.ctx.events.emit(
            &K::CREATE_PHASE,
            EventType::Normal,
            &item.object_ref(),
            EventReason::Created,
            &format!("created {} {}", K::NOUN, run_name),
            item.version(),
        );
        self.ctx.spans.get_span(phase_cx, &run, "", vec![]);

        status.name = run_name;
        status.status = KeptnState::Pending;
        status.set_start_time();
        Ok(())
    }

    fn observe_run(&self, phase_cx: &Context, item: &PhaseItemWrapper, run: &K::Run, status: &mut ItemStatus) {
        let run_cx = self.ctx.spans.get_span(phase_cx, run, "", vec![]);
        status.status = K::reported_state(run);
        if !status.status.is_completed() {
            return;
        }

        let name = &run.metadata().name;
        let span = run_cx.span();
        if status.status.is_succeeded() {
            span.add_event(format!("{} has finished", name), vec![]);
            span.set_status(Status::Ok);
        } else {
            span.add_event(format!("{} has failed", name), vec![]);
            let details = K::failure_details(run);
            for detail in &details {
                span.add_event(detail.clone(), vec![]);
            }
            let mut message = format!("{} failed", K::NOUN);
            for detail in &details {
                message.push('\n');
                message.push_str(detail);
            }
            self.ctx.events.emit(
                &K::RECONCILE_PHASE,
                EventType::Warning,
                &ObjectRef::of(run),
                EventReason::Failed,
                &message,
                item.version(),
            );
            span.set_status(Status::error("Failed"));
        }
        span.end();
        self.ctx.spans.unbind_span(run, "");

        status.set_end_time();
        K::record(&self.ctx.meters, run);
    }
}
