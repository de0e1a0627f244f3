// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Phase State Machine
//!
//! Drives one phase of a version record: abort checks, phase span, the
//! phase's own work, the verdict, and the cascade after a failure.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Turn a phase verdict into status, events and a
//!   scheduling decision
//! - **Collaborators:**
//!   - Domain: PhaseItemWrapper, PhaseResult, EventSender, SpanHandler
//!   - Infrastructure: ObjectStore
//!
//! | Verdict | Entity | Result |
//! |---------|--------|--------|
//! | `Err` | unchanged, not persisted | `Err(PhaseReconcile)` with retry delay |
//! | Succeeded | phase span closed | proceed |
//! | Failed / Cancelled / Deprecated | Failed, later phases Cancelled | stop |
//! | anything else | Progressing | requeue after the phase interval |

use crate::application::context::EngineContext;
use crate::domain::errors::EngineError;
use crate::domain::events::{EventReason, EventType};
use crate::domain::phase_item::{PhaseItem, PhaseItemWrapper};
use crate::domain::reconcile::PhaseResult;
use async_trait::async_trait;
use keptn_lifecycle_api::{KeptnPhaseType, KeptnState};
use opentelemetry::trace::{Status, TraceContextExt};
use opentelemetry::Context;
use tracing::{debug, warn};

/// The work a phase performs each time it is reconciled.
#[async_trait]
pub trait PhaseWork: Send + Sync {
    /// Returns the phase verdict. May update the entity's own status fields.
    async fn reconcile(&self, item: &mut PhaseItemWrapper, phase_cx: &Context) -> Result<KeptnState, EngineError>;
}

pub struct PhaseHandler {
    ctx: EngineContext,
}

impl PhaseHandler {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    pub async fn handle_phase(
        &self,
        entity_cx: &Context,
        item: &mut PhaseItemWrapper,
        phase: &KeptnPhaseType,
        work: &dyn PhaseWork,
    ) -> Result<PhaseResult, EngineError> {
        let old_state = item.state();
        let old_phase = item.current_phase().to_string();
        if old_state.is_failed() || old_state.is_deprecated() {
            debug!(entity = %item.name(), phase = %phase.short_name, state = %old_state, "Skipping phase");
            return Ok(PhaseResult::stop());
        }

        if old_phase != phase.short_name {
            self.emit(item, phase, EventType::Normal, EventReason::Started, "has started");
            item.set_current_phase(phase.short_name);
        }

        let phase_cx = self.ctx.spans.get_span(entity_cx, &*item, phase.short_name, vec![]);
        item.set_phase_trace_id(phase.short_name, self.ctx.tracer.inject(&phase_cx));

        let state = match work.reconcile(item, &phase_cx).await {
            Ok(state) => state,
            Err(source) => {
                let message = format!("{} could not get reconciled", phase.long_name);
                for cx in [entity_cx, &phase_cx] {
                    let span = cx.span();
                    span.add_event(message.clone(), vec![]);
                    span.set_status(Status::error(source.to_string()));
                }
                warn!(entity = %item.name(), phase = %phase.short_name, error = %source, "Phase could not be reconciled");
                self.emit(
                    item,
                    phase,
                    EventType::Warning,
                    EventReason::ReconcileError,
                    "could not get reconciled",
                );
                return Err(EngineError::PhaseReconcile {
                    phase: phase.short_name.to_string(),
                    retry_after: self.ctx.config.phase_requeue_interval,
                    source: Box::new(source),
                });
            }
        };

        let state = if state.is_pending() { KeptnState::Progressing } else { state };
        item.set_phase_state(phase, state);

        let result = if state.is_succeeded() {
            self.close_phase_span(&phase_cx, item, phase, true);
            self.emit(item, phase, EventType::Normal, EventReason::Succeeded, "has finished");
            PhaseResult::proceed()
        } else if state.is_completed() {
            item.complete();
            item.set_state(KeptnState::Failed);
            self.close_phase_span(&phase_cx, item, phase, false);
            self.emit(item, phase, EventType::Warning, EventReason::Failed, "has failed");
            item.cancel_remaining_phases(phase);
            PhaseResult::stop()
        } else {
            item.set_state(KeptnState::Progressing);
            self.emit(item, phase, EventType::Normal, EventReason::NotFinished, "has not finished");
            PhaseResult::retry(self.ctx.config.phase_requeue_interval)
        };

        if item.state() != old_state || item.current_phase() != old_phase {
            self.ctx.store.update_status(&item.to_object()).await?;
        }
        Ok(result)
    }

    fn close_phase_span(&self, phase_cx: &Context, item: &PhaseItemWrapper, phase: &KeptnPhaseType, succeeded: bool) {
        let span = phase_cx.span();
        if succeeded {
            span.add_event(format!("{} has succeeded", phase.long_name), vec![]);
            span.set_status(Status::Ok);
        } else {
            span.add_event(format!("{} has failed", phase.long_name), vec![]);
            span.set_status(Status::error("Failed"));
        }
        span.end();
        self.ctx.spans.unbind_span(item, phase.short_name);
    }

    fn emit(&self, item: &PhaseItemWrapper, phase: &KeptnPhaseType, event_type: EventType, reason: EventReason, message: &str) {
        self.ctx
            .events
            .emit(phase, event_type, &item.object_ref(), reason, message, item.version());
    }
}
