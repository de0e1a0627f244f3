// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Health of the deployed object behind a workload version.

use crate::domain::errors::EngineError;
use async_trait::async_trait;
use keptn_lifecycle_api::workload::ResourceReference;

/// Answers whether a deployed resource is up. Implementations talk to the
/// platform; the engine only polls.
#[async_trait]
pub trait DeploymentProbe: Send + Sync {
    async fn is_running(&self, namespace: &str, resource: &ResourceReference) -> Result<bool, EngineError>;
}
