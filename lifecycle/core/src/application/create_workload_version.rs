// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Create Workload Version Use Case
//!
//! Observes a `KeptnWorkload` and makes sure one `KeptnWorkloadVersion` exists
//! per (workload, version). The new record carries no trace root of its own:
//! it joins the trace of the app version that references it once the app's
//! pre-deployment evaluations pass.

use crate::application::context::EngineContext;
use crate::application::create_app_version::{inbound_carrier, previous_version};
use crate::domain::errors::EngineError;
use crate::domain::events::{EventReason, EventType};
use crate::domain::object::ObjectRef;
use crate::domain::reconcile::ReconcileAction;
use crate::domain::repository::StoreExt;
use keptn_lifecycle_api::phase::CREATE_WORKLOAD_VERSION;
use keptn_lifecycle_api::workload::{KeptnWorkload, KeptnWorkloadVersion, KeptnWorkloadVersionSpec};
use keptn_lifecycle_api::{ObjectKey, ObjectMeta, TraceCarrier};
use tracing::{debug, info, warn};

pub struct WorkloadVersionCreator {
    ctx: EngineContext,
}

impl WorkloadVersionCreator {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileAction, EngineError> {
        let mut workload = match self.ctx.store.get_as::<KeptnWorkload>(key).await {
            Ok(workload) => workload,
            Err(e) if e.is_not_found() => {
                debug!(key = %key, "Workload is gone");
                return Ok(ReconcileAction::Done);
            }
            Err(e) => return Err(e.into()),
        };

        let version_key = ObjectKey::new(&workload.metadata.namespace, workload.workload_version_name());
        match self.ctx.store.get_as::<KeptnWorkloadVersion>(&version_key).await {
            Ok(_) => return Ok(ReconcileAction::Done),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        info!(workload = %workload.metadata.name, version = %workload.spec.version, "Creating workload version");
        let version = generate_workload_version(&workload);
        match self.ctx.store.create_as(version.clone()).await {
            Ok(_) => self.ctx.events.emit(
                &CREATE_WORKLOAD_VERSION,
                EventType::Normal,
                &ObjectRef::of(&version),
                EventReason::WorkloadVersionCreated,
                "created",
                &version.spec.workload.version,
            ),
            Err(e) if e.is_already_exists() => {
                debug!(workload_version = %version.metadata.name, "Workload version already created");
            }
            Err(e) => {
                warn!(workload_version = %version.metadata.name, error = %e, "Could not create workload version");
                self.ctx.events.emit(
                    &CREATE_WORKLOAD_VERSION,
                    EventType::Warning,
                    &ObjectRef::of(&version),
                    EventReason::Failed,
                    "could not create KeptnWorkloadVersion",
                    &version.spec.workload.version,
                );
                return Err(e.into());
            }
        }

        workload.status.current_version = workload.spec.version.clone();
        self.ctx.store.update_status_as(&workload).await?;
        Ok(ReconcileAction::Done)
    }
}

fn generate_workload_version(workload: &KeptnWorkload) -> KeptnWorkloadVersion {
    let mut metadata = ObjectMeta::new(&workload.metadata.namespace, workload.workload_version_name());
    metadata.labels = workload.metadata.labels.clone();
    // the inbound context is kept for reference; the rollout trace comes from the app version
    metadata.annotations = inbound_carrier(&workload.metadata)
        .unwrap_or_default()
        .into_iter()
        .collect();

    KeptnWorkloadVersion {
        metadata,
        spec: KeptnWorkloadVersionSpec {
            workload: workload.spec.clone(),
            workload_name: workload.metadata.name.clone(),
            previous_version: previous_version(&workload.spec.version, &workload.status.current_version),
            trace_id: TraceCarrier::new(),
        },
        status: Default::default(),
    }
}
