// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Lifecycle Metrics
//!
//! Counters and duration histograms for completed runs and rollouts, and
//! gauges for the number of records still in flight. Recorded through the
//! `metrics` facade; the exporter is chosen by the embedding process.

use crate::domain::repository::{ObjectStore, StoreError, StoreExt};
use crate::domain::span::{
    APP_NAME, APP_NAMESPACE, APP_VERSION, EVALUATION_NAME, EVALUATION_TYPE, TASK_NAME, TASK_TYPE,
    WORKLOAD_NAME, WORKLOAD_NAMESPACE, WORKLOAD_VERSION,
};
use chrono::{DateTime, Utc};
use keptn_lifecycle_api::app::KeptnAppVersion;
use keptn_lifecycle_api::evaluation::KeptnEvaluation;
use keptn_lifecycle_api::task::KeptnTask;
use keptn_lifecycle_api::workload::KeptnWorkloadVersion;
use metrics::{counter, gauge, histogram};
use std::sync::Arc;

fn elapsed_seconds(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Option<f64> {
    match (start, end) {
        (Some(start), Some(end)) => (end - start).to_std().ok().map(|d| d.as_secs_f64()),
        _ => None,
    }
}

/// Records completion metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleMeters;

impl LifecycleMeters {
    pub fn record_task(&self, task: &KeptnTask) {
        let labels = [
            (APP_NAME, task.spec.context.app_name.clone()),
            (WORKLOAD_NAME, task.spec.context.workload_name.clone()),
            (TASK_NAME, task.spec.task_definition.clone()),
            (TASK_TYPE, task.spec.check_type.as_str().to_string()),
            ("status", task.status.status.to_string()),
        ];
        counter!("keptn_task_count", &labels).increment(1);
        if let Some(duration) = task.duration() {
            histogram!("keptn_task_duration_seconds", &labels).record(duration.as_secs_f64());
        }
    }

    pub fn record_evaluation(&self, evaluation: &KeptnEvaluation) {
        let labels = [
            (APP_NAME, evaluation.spec.context.app_name.clone()),
            (WORKLOAD_NAME, evaluation.spec.context.workload_name.clone()),
            (EVALUATION_NAME, evaluation.spec.evaluation_definition.clone()),
            (EVALUATION_TYPE, evaluation.spec.check_type.as_str().to_string()),
            ("status", evaluation.status.overall_status.to_string()),
        ];
        counter!("keptn_evaluation_count", &labels).increment(1);
        if let Some(duration) = evaluation.duration() {
            histogram!("keptn_evaluation_duration_seconds", &labels).record(duration.as_secs_f64());
        }
    }

    pub fn record_app_version(&self, version: &KeptnAppVersion) {
        let labels = [
            (APP_NAME, version.spec.app_name.clone()),
            (APP_VERSION, version.spec.app.version.clone()),
            (APP_NAMESPACE, version.metadata.namespace.clone()),
            ("status", version.status.status.to_string()),
        ];
        counter!("keptn_app_count", &labels).increment(1);
        if let Some(seconds) = elapsed_seconds(version.status.start_time, version.status.end_time) {
            histogram!("keptn_app_duration_seconds", &labels).record(seconds);
        }
    }

    pub fn record_workload_version(&self, version: &KeptnWorkloadVersion) {
        let labels = [
            (APP_NAME, version.spec.workload.app_name.clone()),
            (WORKLOAD_NAME, version.spec.workload_name.clone()),
            (WORKLOAD_VERSION, version.spec.workload.version.clone()),
            (WORKLOAD_NAMESPACE, version.metadata.namespace.clone()),
            ("status", version.status.status.to_string()),
        ];
        counter!("keptn_deployment_count", &labels).increment(1);
        if let Some(seconds) = elapsed_seconds(version.status.start_time, version.status.end_time) {
            histogram!("keptn_deployment_duration_seconds", &labels).record(seconds);
        }
    }
}

/// Records that have not reached an end state, per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActiveCounts {
    pub apps: usize,
    pub deployments: usize,
    pub tasks: usize,
    pub evaluations: usize,
}

/// Refreshes the `*_active` gauges from the store.
pub struct ActiveInstancesCollector {
    store: Arc<dyn ObjectStore>,
}

impl ActiveInstancesCollector {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub async fn collect(&self, namespaces: &[String]) -> Result<ActiveCounts, StoreError> {
        let mut counts = ActiveCounts::default();
        for namespace in namespaces {
            counts.apps += self
                .store
                .list_as::<KeptnAppVersion>(namespace)
                .await?
                .iter()
                .filter(|v| v.status.end_time.is_none())
                .count();
            counts.deployments += self
                .store
                .list_as::<KeptnWorkloadVersion>(namespace)
                .await?
                .iter()
                .filter(|v| v.status.end_time.is_none())
                .count();
            counts.tasks += self
                .store
                .list_as::<KeptnTask>(namespace)
                .await?
                .iter()
                .filter(|t| !t.status.status.is_completed())
                .count();
            counts.evaluations += self
                .store
                .list_as::<KeptnEvaluation>(namespace)
                .await?
                .iter()
                .filter(|e| !e.status.overall_status.is_completed())
                .count();
        }

        gauge!("keptn_app_active").set(counts.apps as f64);
        gauge!("keptn_deployment_active").set(counts.deployments as f64);
        gauge!("keptn_task_active").set(counts.tasks as f64);
        gauge!("keptn_evaluation_active").set(counts.evaluations as f64);
        tracing::debug!(
            apps = counts.apps,
            deployments = counts.deployments,
            tasks = counts.tasks,
            evaluations = counts.evaluations,
            "Refreshed active instance gauges"
        );
        Ok(counts)
    }
}
