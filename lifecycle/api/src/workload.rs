// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Workload Records
//!
//! `KeptnWorkload` is one deployable unit of an application; each observed
//! version of it produces one `KeptnWorkloadVersion` driven through the
//! workload pipeline.

use crate::item_status::{CheckDefinitions, RunStatusLists};
use crate::meta::{ObjectMeta, TraceCarrier};
use crate::naming::{create_resource_name, MAX_OBJECT_NAME_LENGTH, MIN_SEGMENT_LENGTH};
use crate::phase::{cascade_remaining_phases, KeptnPhaseType, WORKLOAD_PIPELINE};
use crate::state::KeptnState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The deployed object whose health decides the deployment phase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ResourceReference {
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeptnWorkloadSpec {
    pub app_name: String,
    pub version: String,
    #[serde(default)]
    pub resource_reference: ResourceReference,
    #[serde(flatten)]
    pub checks: CheckDefinitions,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeptnWorkloadStatus {
    #[serde(default)]
    pub current_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeptnWorkload {
    pub metadata: ObjectMeta,
    pub spec: KeptnWorkloadSpec,
    #[serde(default)]
    pub status: KeptnWorkloadStatus,
}

impl KeptnWorkload {
    pub fn workload_version_name(&self) -> String {
        create_resource_name(
            MAX_OBJECT_NAME_LENGTH,
            MIN_SEGMENT_LENGTH,
            &[&self.metadata.name, &self.spec.version],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeptnWorkloadVersionSpec {
    #[serde(flatten)]
    pub workload: KeptnWorkloadSpec,
    pub workload_name: String,
    #[serde(default)]
    pub previous_version: String,
    #[serde(default)]
    pub trace_id: TraceCarrier,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeptnWorkloadVersionStatus {
    #[serde(default)]
    pub pre_deployment_status: KeptnState,
    #[serde(default)]
    pub pre_deployment_evaluation_status: KeptnState,
    #[serde(default)]
    pub deployment_status: KeptnState,
    #[serde(default)]
    pub post_deployment_status: KeptnState,
    #[serde(default)]
    pub post_deployment_evaluation_status: KeptnState,
    #[serde(default)]
    pub current_phase: String,
    #[serde(flatten)]
    pub runs: RunStatusLists,
    #[serde(default)]
    pub phase_trace_ids: BTreeMap<String, TraceCarrier>,
    #[serde(default)]
    pub status: KeptnState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// First time the deployment health was probed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_start_time: Option<DateTime<Utc>>,
}

impl KeptnWorkloadVersionStatus {
    fn pipeline_states_mut(&mut self) -> [&mut KeptnState; 5] {
        [
            &mut self.pre_deployment_status,
            &mut self.pre_deployment_evaluation_status,
            &mut self.deployment_status,
            &mut self.post_deployment_status,
            &mut self.post_deployment_evaluation_status,
        ]
    }

    pub fn phase_state(&self, phase: &KeptnPhaseType) -> Option<KeptnState> {
        let states = [
            self.pre_deployment_status,
            self.pre_deployment_evaluation_status,
            self.deployment_status,
            self.post_deployment_status,
            self.post_deployment_evaluation_status,
        ];
        WORKLOAD_PIPELINE.iter().position(|p| p == phase).map(|idx| states[idx])
    }

    pub fn set_phase_state(&mut self, phase: &KeptnPhaseType, state: KeptnState) {
        if let Some(idx) = WORKLOAD_PIPELINE.iter().position(|p| p == phase) {
            if let Some(slot) = self.pipeline_states_mut().into_iter().nth(idx) {
                *slot = state;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeptnWorkloadVersion {
    pub metadata: ObjectMeta,
    pub spec: KeptnWorkloadVersionSpec,
    #[serde(default)]
    pub status: KeptnWorkloadVersionStatus,
}

impl KeptnWorkloadVersion {
    pub fn cancel_remaining_phases(&mut self, phase: &KeptnPhaseType) {
        let overall =
            cascade_remaining_phases(&WORKLOAD_PIPELINE, self.status.pipeline_states_mut(), phase);
        self.status.status = overall;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::{WORKLOAD_DEPLOYMENT, WORKLOAD_POST_DEPLOYMENT_TASKS};

    #[test]
    fn test_version_name() {
        let workload = KeptnWorkload {
            metadata: ObjectMeta::new("demo", "podtato-frontend"),
            spec: KeptnWorkloadSpec {
                app_name: "podtato".to_string(),
                version: "0.2.0".to_string(),
                ..Default::default()
            },
            status: KeptnWorkloadStatus::default(),
        };
        assert_eq!(workload.workload_version_name(), "podtato-frontend-0.2.0");
    }

    #[test]
    fn test_deployment_failure_cancels_post_phases() {
        let mut record = KeptnWorkloadVersion {
            metadata: ObjectMeta::new("demo", "podtato-frontend-0.2.0"),
            spec: KeptnWorkloadVersionSpec::default(),
            status: KeptnWorkloadVersionStatus::default(),
        };
        record.status.pre_deployment_status = KeptnState::Succeeded;
        record.status.pre_deployment_evaluation_status = KeptnState::Succeeded;
        record.status.set_phase_state(&WORKLOAD_DEPLOYMENT, KeptnState::Failed);
        record.cancel_remaining_phases(&WORKLOAD_DEPLOYMENT);

        assert_eq!(record.status.status, KeptnState::Failed);
        assert_eq!(record.status.deployment_status, KeptnState::Failed);
        assert_eq!(
            record.status.phase_state(&WORKLOAD_POST_DEPLOYMENT_TASKS),
            Some(KeptnState::Cancelled)
        );
        assert_eq!(record.status.post_deployment_evaluation_status, KeptnState::Cancelled);
        assert_eq!(record.status.pre_deployment_status, KeptnState::Succeeded);
    }

    #[test]
    fn test_status_wire_format() {
        let yaml = "preDeploymentStatus: Succeeded\npreDeploymentTaskStatus:\n  - definitionName: smoke\n    name: pre-smoke-12345\n    status: Succeeded\n";
        let status: KeptnWorkloadVersionStatus = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(status.pre_deployment_status, KeptnState::Succeeded);
        assert_eq!(status.runs.pre_deployment_task_status[0].name, "pre-smoke-12345");
        assert_eq!(status.deployment_status, KeptnState::Pending);
    }
}
