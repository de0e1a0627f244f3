// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Workload Version Reconciler
//!
//! Drives a `KeptnWorkloadVersion` through the workload pipeline. Before its
//! first phase a workload waits for the pre-deployment evaluations of the
//! application version that references it; its deployment phase polls a
//! [`DeploymentProbe`] until the deployed resource runs or the observability
//! timeout passes.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** One `reconcile(key)` call per scheduler invocation
//! - **Collaborators:**
//!   - Application: PhaseHandler, TaskHandler, EvaluationHandler
//!   - Domain: ObjectStore, EventSender, SpanHandler, DeploymentProbe

use crate::application::context::EngineContext;
use crate::application::evaluation_handler::{EvaluationHandler, EvaluationRuns};
use crate::application::phase_handler::{PhaseHandler, PhaseWork};
use crate::application::pipeline::{close_failed_entity, finish_entity, open_entity_span, RunPhase};
use crate::application::run_handler::RunHandler;
use crate::application::task_handler::{TaskHandler, TaskRuns};
use crate::domain::deployment::DeploymentProbe;
use crate::domain::errors::EngineError;
use crate::domain::events::{EventReason, EventType};
use crate::domain::object::ObjectRef;
use crate::domain::phase_item::{PhaseItem, PhaseItemWrapper};
use crate::domain::reconcile::{PhaseResult, ReconcileAction};
use crate::domain::repository::StoreExt;
use async_trait::async_trait;
use chrono::Utc;
use keptn_lifecycle_api::app::{workload_name_of_app, KeptnAppVersion};
use keptn_lifecycle_api::phase::{
    PhaseKind, APP_DEPLOYMENT, APP_PRE_DEPLOYMENT_EVALUATIONS, WORKLOAD_COMPLETED, WORKLOAD_DEPLOYMENT,
    WORKLOAD_PIPELINE,
};
use keptn_lifecycle_api::workload::KeptnWorkloadVersion;
use keptn_lifecycle_api::{KeptnPhaseType, KeptnState, ObjectKey};
use opentelemetry::Context;
use std::sync::Arc;
use tracing::{debug, info};

pub struct WorkloadVersionReconciler {
    ctx: EngineContext,
    probe: Arc<dyn DeploymentProbe>,
    phases: PhaseHandler,
    tasks: TaskHandler,
    evaluations: EvaluationHandler,
}

impl WorkloadVersionReconciler {
    pub fn new(ctx: EngineContext, probe: Arc<dyn DeploymentProbe>) -> Self {
        Self {
            probe,
            phases: PhaseHandler::new(ctx.clone()),
            tasks: RunHandler::<TaskRuns>::new(ctx.clone()),
            evaluations: RunHandler::<EvaluationRuns>::new(ctx.clone()),
            ctx,
        }
    }

    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileAction, EngineError> {
        let version = match self.ctx.store.get_as::<KeptnWorkloadVersion>(key).await {
            Ok(version) => version,
            Err(e) if e.is_not_found() => {
                debug!(key = %key, "Workload version is gone");
                return Ok(ReconcileAction::Done);
            }
            Err(e) => return Err(e.into()),
        };
        if version.status.end_time.is_some() {
            return Ok(ReconcileAction::Done);
        }

        let mut parent = self.ctx.tracer.extract(&version.spec.trace_id);
        if version.status.current_phase.is_empty() {
            match self.app_gate(&version).await? {
                Some(app_cx) => {
                    if version.spec.trace_id.is_empty() {
                        parent = app_cx;
                    }
                }
                None => return Ok(ReconcileAction::RequeueAfter(self.ctx.config.dependency_requeue_interval)),
            }
        }

        info!(workload = %version.spec.workload_name, version = %version.spec.workload.version, "Reconciling workload version");
        let mut item = PhaseItemWrapper::from(version);
        item.set_start_time();
        let entity_cx = open_entity_span(&self.ctx, &item, &parent);

        for phase in WORKLOAD_PIPELINE.iter() {
            if item.phase_state(phase).is_some_and(|state| state.is_succeeded()) {
                continue;
            }
            let result = self.run_phase(&entity_cx, &mut item, phase).await?;
            if !result.proceed {
                if item.state().is_failed() {
                    close_failed_entity(&self.ctx, &entity_cx, &item, &WORKLOAD_COMPLETED);
                }
                return Ok(result.action);
            }
        }

        finish_entity(&self.ctx, &entity_cx, &mut item, &WORKLOAD_COMPLETED).await
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
                let work = DeploymentCheck {
                    ctx: &self.ctx,
                    probe: self.probe.as_ref(),
                };
                self.phases.handle_phase(entity_cx, item, phase, &work).await
            }
        }
    }

    /// Returns the trace context to continue from once the owning app
    /// version passed its pre-deployment evaluations, or `None` to wait.
    async fn app_gate(&self, workload_version: &KeptnWorkloadVersion) -> Result<Option<Context>, EngineError> {
        let Some(app_version) = self.find_app_version(workload_version).await? else {
            self.emit_gate_warning(workload_version, EventReason::NotFound, "has failed since app could not be found");
            return Ok(None);
        };

        if !app_version.is_pre_deployment_evaluation_succeeded() {
            if app_version.is_pre_deployment_evaluation_failed() {
                self.emit_gate_warning(workload_version, EventReason::Failed, "has failed since app has failed");
            }
            debug!(
                workload = %workload_version.metadata.name,
                app_version = %app_version.metadata.name,
                "Waiting for app pre-deployment evaluations"
            );
            return Ok(None);
        }

        let carrier = app_version
            .status
            .phase_trace_ids
            .get(APP_DEPLOYMENT.short_name)
            .unwrap_or(&app_version.spec.trace_id);
        Ok(Some(self.ctx.tracer.extract(carrier)))
    }

    /// Newest non-deprecated app version that lists this workload version.
    async fn find_app_version(
        &self,
        workload_version: &KeptnWorkloadVersion,
    ) -> Result<Option<KeptnAppVersion>, EngineError> {
        let app_versions = self
            .ctx
            .store
            .list_as::<KeptnAppVersion>(&workload_version.metadata.namespace)
            .await?;
        Ok(app_versions
            .into_iter()
            .filter(|app| !app.status.status.is_deprecated())
            .filter(|app| app.spec.app_name == workload_version.spec.workload.app_name)
            .filter(|app| {
                app.spec.app.workloads.iter().any(|workload| {
                    workload.version == workload_version.spec.workload.version
                        && workload_name_of_app(&app.spec.app_name, &workload.name)
                            == workload_version.spec.workload_name
                })
            })
            .max_by_key(|app| (app.spec.revision, app.metadata.created_at)))
    }

    fn emit_gate_warning(&self, workload_version: &KeptnWorkloadVersion, reason: EventReason, message: &str) {
        self.ctx.events.emit(
            &APP_PRE_DEPLOYMENT_EVALUATIONS,
            EventType::Warning,
            &ObjectRef::of(workload_version),
            reason,
            message,
            &workload_version.spec.workload.version,
        );
    }
}

/// Deployment phase of a workload: is the deployed resource running yet?
struct DeploymentCheck<'a> {
    ctx: &'a EngineContext,
    probe: &'a dyn DeploymentProbe,
}

#[async_trait]
impl<'a> PhaseWork for DeploymentCheck<'a> {
    async fn reconcile(&self, item: &mut PhaseItemWrapper, _phase_cx: &Context) -> Result<KeptnState, EngineError> {
        let kind = item.kind();
        let Some(workload_version) = item.as_workload_version_mut() else {
            return Err(EngineError::CannotWrapToPhaseItem(kind));
        };

        if let Some(started) = workload_version.status.deployment_start_time {
            let timed_out = (Utc::now() - started)
                .to_std()
                .map(|elapsed| elapsed > self.ctx.config.observability_timeout)
                .unwrap_or(false);
            if timed_out {
                self.ctx.events.emit(
                    &WORKLOAD_DEPLOYMENT,
                    EventType::Warning,
                    &ObjectRef::of(&*workload_version),
                    EventReason::Failed,
                    "has reached timeout",
                    &workload_version.spec.workload.version,
                );
                return Ok(KeptnState::Failed);
            }
        }

        let running = self
            .probe
            .is_running(
                &workload_version.metadata.namespace,
                &workload_version.spec.workload.resource_reference,
            )
            .await?;
        workload_version.status.deployment_start_time.get_or_insert_with(Utc::now);
        Ok(if running {
            KeptnState::Succeeded
        } else {
            KeptnState::Progressing
        })
    }
}
