// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! App Version Reconciler
//!
//! Drives a `KeptnAppVersion` through the application pipeline. The
//! deployment phase of an application is the aggregate of its workload
//! versions.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** One `reconcile(key)` call per scheduler invocation
//! - **Collaborators:**
//!   - Application: PhaseHandler, TaskHandler, EvaluationHandler
//!   - Domain: ObjectStore, EventSender, SpanHandler

use crate::application::context::EngineContext;
use crate::application::evaluation_handler::{EvaluationHandler, EvaluationRuns};
use crate::application::phase_handler::{PhaseHandler, PhaseWork};
use crate::application::pipeline::{close_failed_entity, finish_entity, open_entity_span, RunPhase};
use crate::application::run_handler::RunHandler;
use crate::application::task_handler::{TaskHandler, TaskRuns};
use crate::domain::errors::EngineError;
use crate::domain::events::{EventReason, EventType};
use crate::domain::object::ObjectRef;
use crate::domain::phase_item::{PhaseItem, PhaseItemWrapper};
use crate::domain::reconcile::{PhaseResult, ReconcileAction};
use crate::domain::repository::StoreExt;
use async_trait::async_trait;
use keptn_lifecycle_api::app::{KeptnAppVersion, WorkloadStatus};
use keptn_lifecycle_api::phase::{PhaseKind, APP_COMPLETED, APP_DEPLOYMENT, APP_PIPELINE};
use keptn_lifecycle_api::workload::KeptnWorkloadVersion;
use keptn_lifecycle_api::{
    get_overall_state, update_status_summary, KeptnPhaseType, KeptnState, ObjectKey, StatusSummary,
};
use opentelemetry::Context;
use tracing::{debug, info};

pub struct AppVersionReconciler {
    ctx: EngineContext,
    phases: PhaseHandler,
    tasks: TaskHandler,
    evaluations: EvaluationHandler,
}

impl AppVersionReconciler {
    pub fn new(ctx: EngineContext) -> Self {
        Self {
            phases: PhaseHandler::new(ctx.clone()),
            tasks: RunHandler::<TaskRuns>::new(ctx.clone()),
            evaluations: RunHandler::<EvaluationRuns>::new(ctx.clone()),
            ctx,
        }
    }

    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileAction, EngineError> {
        let version = match self.ctx.store.get_as::<KeptnAppVersion>(key).await {
            Ok(version) => version,
            Err(e) if e.is_not_found() => {
                debug!(key = %key, "App version is gone");
                return Ok(ReconcileAction::Done);
            }
            Err(e) => return Err(e.into()),
        };
        if version.status.end_time.is_some() {
            return Ok(ReconcileAction::Done);
        }

        info!(app = %version.spec.app_name, version = %version.spec.app.version, "Reconciling app version");
        let mut item = PhaseItemWrapper::from(version);
        item.set_start_time();

        let parent = self.ctx.tracer.extract(item.trace_id());
        let entity_cx = open_entity_span(&self.ctx, &item, &parent);

        for phase in APP_PIPELINE.iter() {
            if item.phase_state(phase).is_some_and(|state| state.is_succeeded()) {
                continue;
            }
            let result = self.run_phase(&entity_cx, &mut item, phase).await?;
            if !result.proceed {
                if item.state().is_failed() {
                    close_failed_entity(&self.ctx, &entity_cx, &item, &APP_COMPLETED);
                }
                return Ok(result.action);
            }
        }

        finish_entity(&self.ctx, &entity_cx, &mut item, &APP_COMPLETED).await
    }

    async fn run_phase(
        &self,
        entity_cx: &Context,
        item: &mut PhaseItemWrapper,
        phase: &KeptnPhaseType,
    ) -> Result<PhaseResult, EngineError> {
        match (phase.kind, phase.check_type()) {
            (PhaseKind::Task, Some(check_type)) => {
                let work = RunPhase {
                    handler: &self.tasks,
                    check_type,
                };
                self.phases.handle_phase(entity_cx, item, phase, &work).await
            }
            (PhaseKind::Evaluation, Some(check_type)) => {
                let work = RunPhase {
                    handler: &self.evaluations,
                    check_type,
                };
                self.phases.handle_phase(entity_cx, item, phase, &work).await
            }
            _ => {
                let work = WorkloadAggregation { ctx: &self.ctx };
                self.phases.handle_phase(entity_cx, item, phase, &work).await
            }
        }
    }
}

/// Deployment phase of an application: the combined state of the workload
/// versions it references.
struct WorkloadAggregation<'a> {
    ctx: &'a EngineContext,
}

#[async_trait]
impl<'a> PhaseWork for WorkloadAggregation<'a> {
    async fn reconcile(&self, item: &mut PhaseItemWrapper, _phase_cx: &Context) -> Result<KeptnState, EngineError> {
        let kind = item.kind();
        let Some(app_version) = item.as_app_version_mut() else {
            return Err(EngineError::CannotWrapToPhaseItem(kind));
        };

        let workloads = app_version.spec.app.workloads.clone();
        let mut summary = StatusSummary::with_total(workloads.len());
        let mut workload_status = Vec::with_capacity(workloads.len());
        for workload in workloads {
            let name = app_version.workload_version_name(&workload);
            let key = ObjectKey::new(&app_version.metadata.namespace, &name);
            let state = match self.ctx.store.get_as::<KeptnWorkloadVersion>(&key).await {
                Ok(workload_version) => workload_version.status.status,
                Err(e) if e.is_not_found() => {
                    self.ctx.events.emit(
                        &APP_DEPLOYMENT,
                        EventType::Warning,
                        &ObjectRef::of(&*app_version),
                        EventReason::NotFound,
                        &format!("workload version {} not found", name),
                        &app_version.spec.app.version,
                    );
                    KeptnState::Pending
                }
                Err(e) => return Err(e.into()),
            };
            summary = update_status_summary(state, summary);
            workload_status.push(WorkloadStatus {
                workload,
                status: state,
            });
        }
        app_version.status.workload_status = workload_status;
        Ok(get_overall_state(&summary))
    }
}
