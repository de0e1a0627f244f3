// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Application Records
//!
//! `KeptnApp` is the declared application; each observed spec generation of
//! it produces one immutable `KeptnAppVersion` that is driven through the
//! application pipeline.

use crate::item_status::{CheckDefinitions, RunStatusLists};
use crate::meta::{ObjectMeta, TraceCarrier};
use crate::naming::{create_resource_name, hash_generation, MAX_OBJECT_NAME_LENGTH, MIN_SEGMENT_LENGTH};
use crate::phase::{cascade_remaining_phases, KeptnPhaseType, APP_PIPELINE};
use crate::state::KeptnState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reference from an application to one of its workloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeptnWorkloadRef {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeptnAppSpec {
    pub version: String,
    #[serde(default)]
    pub workloads: Vec<KeptnWorkloadRef>,
    #[serde(flatten)]
    pub checks: CheckDefinitions,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeptnAppStatus {
    #[serde(default)]
    pub current_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeptnApp {
    pub metadata: ObjectMeta,
    pub spec: KeptnAppSpec,
    #[serde(default)]
    pub status: KeptnAppStatus,
}

impl KeptnApp {
    /// Name of the version record for the current generation.
    pub fn app_version_name(&self) -> String {
        self.version_name_for_generation(self.metadata.generation)
    }

    pub fn version_name_for_generation(&self, generation: i64) -> String {
        create_resource_name(
            MAX_OBJECT_NAME_LENGTH,
            MIN_SEGMENT_LENGTH,
            &[&self.metadata.name, &self.spec.version, &hash_generation(generation)],
        )
    }
}

/// Workload names inside an application are scoped by the application name.
pub fn workload_name_of_app(app_name: &str, workload_name: &str) -> String {
    format!("{}-{}", app_name, workload_name)
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeptnAppVersionSpec {
    #[serde(flatten)]
    pub app: KeptnAppSpec,
    pub app_name: String,
    #[serde(default)]
    pub previous_version: String,
    /// Generation of the application this record was created from.
    pub revision: i64,
    /// Root context of this rollout's trace.
    #[serde(default)]
    pub trace_id: TraceCarrier,
    /// Inbound contexts the rollout span links to.
    #[serde(default)]
    pub span_links: Vec<TraceCarrier>,
}

/// Aggregated state of one referenced workload version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadStatus {
    pub workload: KeptnWorkloadRef,
    #[serde(default)]
    pub status: KeptnState,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeptnAppVersionStatus {
    #[serde(default)]
    pub pre_deployment_status: KeptnState,
    #[serde(default)]
    pub pre_deployment_evaluation_status: KeptnState,
    #[serde(default)]
    pub workload_overall_status: KeptnState,
    #[serde(default)]
    pub post_deployment_status: KeptnState,
    #[serde(default)]
    pub post_deployment_evaluation_status: KeptnState,
    #[serde(default)]
    pub workload_status: Vec<WorkloadStatus>,
    #[serde(default)]
    pub current_phase: String,
    #[serde(flatten)]
    pub runs: RunStatusLists,
    /// Trace carrier of each phase span, keyed by short phase name.
    #[serde(default)]
    pub phase_trace_ids: BTreeMap<String, TraceCarrier>,
    #[serde(default)]
    pub status: KeptnState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl KeptnAppVersionStatus {
    fn pipeline_states_mut(&mut self) -> [&mut KeptnState; 5] {
        [
            &mut self.pre_deployment_status,
            &mut self.pre_deployment_evaluation_status,
            &mut self.workload_overall_status,
            &mut self.post_deployment_status,
            &mut self.post_deployment_evaluation_status,
        ]
    }

    /// Stored status of a pipeline phase.
    pub fn phase_state(&self, phase: &KeptnPhaseType) -> Option<KeptnState> {
        let states = [
            self.pre_deployment_status,
            self.pre_deployment_evaluation_status,
            self.workload_overall_status,
            self.post_deployment_status,
            self.post_deployment_evaluation_status,
        ];
        APP_PIPELINE.iter().position(|p| p == phase).map(|idx| states[idx])
    }

    pub fn set_phase_state(&mut self, phase: &KeptnPhaseType, state: KeptnState) {
        if let Some(idx) = APP_PIPELINE.iter().position(|p| p == phase) {
            if let Some(slot) = self.pipeline_states_mut().into_iter().nth(idx) {
                *slot = state;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeptnAppVersion {
    pub metadata: ObjectMeta,
    pub spec: KeptnAppVersionSpec,
    #[serde(default)]
    pub status: KeptnAppVersionStatus,
}

impl KeptnAppVersion {
    /// Marks every phase that can no longer run after `phase` and moves the
    /// record into its final overall state.
    pub fn cancel_remaining_phases(&mut self, phase: &KeptnPhaseType) {
        let overall = cascade_remaining_phases(&APP_PIPELINE, self.status.pipeline_states_mut(), phase);
        self.status.status = overall;
    }

    pub fn is_pre_deployment_evaluation_succeeded(&self) -> bool {
        self.status.pre_deployment_evaluation_status.is_succeeded()
    }

    pub fn is_pre_deployment_evaluation_failed(&self) -> bool {
        self.status.pre_deployment_evaluation_status.is_failed()
    }

    /// Name of the workload version record produced for `workload`.
    pub fn workload_version_name(&self, workload: &KeptnWorkloadRef) -> String {
        create_resource_name(
            MAX_OBJECT_NAME_LENGTH,
            MIN_SEGMENT_LENGTH,
            &[&workload_name_of_app(&self.spec.app_name, &workload.name), &workload.version],
        )
    }
}
