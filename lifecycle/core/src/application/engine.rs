// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Lifecycle Engine
//!
//! Single entry point for the external scheduler. Every call is stateless
//! apart from the span cache: the scheduler invokes `reconcile(kind, key)`
//! on change notifications or polls and honors the returned
//! [`ReconcileAction`] or the error's `retry_after()` hint.

use crate::application::app_version_reconciler::AppVersionReconciler;
use crate::application::context::EngineContext;
use crate::application::create_app_version::AppVersionCreator;
use crate::application::create_workload_version::WorkloadVersionCreator;
use crate::application::workload_version_reconciler::WorkloadVersionReconciler;
use crate::domain::deployment::DeploymentProbe;
use crate::domain::errors::EngineError;
use crate::domain::object::ObjectKind;
use crate::domain::reconcile::ReconcileAction;
use crate::domain::repository::StoreError;
use crate::infrastructure::telemetry::{ActiveCounts, ActiveInstancesCollector};
use async_trait::async_trait;
use keptn_lifecycle_api::ObjectKey;
use std::sync::Arc;
use tracing::{debug, warn};

#[async_trait]
pub trait ReconcileUseCase: Send + Sync {
    async fn reconcile(&self, kind: ObjectKind, key: &ObjectKey) -> Result<ReconcileAction, EngineError>;
}

pub struct LifecycleEngine {
    apps: AppVersionCreator,
    workloads: WorkloadVersionCreator,
    app_versions: AppVersionReconciler,
    workload_versions: WorkloadVersionReconciler,
    active: ActiveInstancesCollector,
}

impl LifecycleEngine {
    pub fn new(ctx: EngineContext, probe: Arc<dyn DeploymentProbe>) -> Self {
        Self {
            apps: AppVersionCreator::new(ctx.clone()),
            workloads: WorkloadVersionCreator::new(ctx.clone()),
            app_versions: AppVersionReconciler::new(ctx.clone()),
            workload_versions: WorkloadVersionReconciler::new(ctx.clone(), probe),
            active: ActiveInstancesCollector::new(ctx.store.clone()),
        }
    }

    /// Refreshes the in-flight gauges for `namespaces`.
    pub async fn collect_active(&self, namespaces: &[String]) -> Result<ActiveCounts, StoreError> {
        self.active.collect(namespaces).await
    }
}

#[async_trait]
impl ReconcileUseCase for LifecycleEngine {
    async fn reconcile(&self, kind: ObjectKind, key: &ObjectKey) -> Result<ReconcileAction, EngineError> {
        let result = match kind {
            ObjectKind::App => self.apps.reconcile(key).await,
            ObjectKind::Workload => self.workloads.reconcile(key).await,
            ObjectKind::AppVersion => self.app_versions.reconcile(key).await,
            ObjectKind::WorkloadVersion => self.workload_versions.reconcile(key).await,
            // runs and definitions are reconciled by their runners
            other => {
                debug!(kind = %other, key = %key, "Nothing to reconcile");
                Ok(ReconcileAction::Done)
            }
        };
        if let Err(e) = &result {
            warn!(kind = %kind, key = %key, error = %e, retry_after = ?e.retry_after(), "Reconcile failed");
        }
        result
    }
}
