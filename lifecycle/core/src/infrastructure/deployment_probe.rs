// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
// Deployment probe backed by reported readiness
//
// Platform watchers push the readiness of deployed resources into this probe;
// the workload pipeline reads it back when polling the deployment phase.

use crate::domain::deployment::DeploymentProbe;
use crate::domain::errors::EngineError;
use async_trait::async_trait;
use dashmap::DashMap;
use keptn_lifecycle_api::workload::ResourceReference;
use tracing::debug;

type ResourceKey = (String, String, String);

#[derive(Debug, Default)]
pub struct ReportedDeploymentProbe {
    ready: DashMap<ResourceKey, bool>,
}

impl ReportedDeploymentProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, namespace: &str, resource: &ResourceReference, running: bool) {
        debug!(namespace, kind = %resource.kind, name = %resource.name, running, "Deployment readiness reported");
        self.ready.insert(key(namespace, resource), running);
    }

    pub fn forget(&self, namespace: &str, resource: &ResourceReference) {
        self.ready.remove(&key(namespace, resource));
    }
}

fn key(namespace: &str, resource: &ResourceReference) -> ResourceKey {
    (namespace.to_string(), resource.kind.clone(), resource.name.clone())
}

#[async_trait]
impl DeploymentProbe for ReportedDeploymentProbe {
    async fn is_running(&self, namespace: &str, resource: &ResourceReference) -> Result<bool, EngineError> {
        Ok(self
            .ready
            .get(&key(namespace, resource))
            .map(|entry| *entry.value())
            .unwrap_or(false))
    }
}
