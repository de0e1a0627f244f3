// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Evaluation Records
//!
//! A `KeptnEvaluationDefinition` names metric objectives; a `KeptnEvaluation`
//! is the run that checks them for one version record. Retrying failed
//! objectives is the runner's job, bounded by the run's failure conditions.

use crate::meta::{ObjectMeta, TraceCarrier};
use crate::phase::CheckType;
use crate::state::KeptnState;
use crate::task::RunContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objective {
    pub name: String,
    /// Target expression such as `<500`.
    pub evaluation_target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureConditions {
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_interval", with = "humantime_serde")]
    pub retry_interval: Duration,
}

impl Default for FailureConditions {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            retry_interval: default_retry_interval(),
        }
    }
}

fn default_retries() -> u32 {
    10
}

fn default_retry_interval() -> Duration {
    Duration::from_secs(5)
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeptnEvaluationDefinitionSpec {
    #[serde(default)]
    pub objectives: Vec<Objective>,
    #[serde(default)]
    pub failure_conditions: FailureConditions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeptnEvaluationDefinition {
    pub metadata: ObjectMeta,
    pub spec: KeptnEvaluationDefinitionSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeptnEvaluationSpec {
    pub evaluation_definition: String,
    pub context: RunContext,
    pub check_type: CheckType,
    #[serde(default)]
    pub failure_conditions: FailureConditions,
    #[serde(default)]
    pub trace_context: TraceCarrier,
}

/// Result of one objective.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvaluationStatusItem {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub status: KeptnState,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeptnEvaluationStatus {
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub evaluation_status: BTreeMap<String, EvaluationStatusItem>,
    #[serde(default)]
    pub overall_status: KeptnState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeptnEvaluation {
    pub metadata: ObjectMeta,
    pub spec: KeptnEvaluationSpec,
    #[serde(default)]
    pub status: KeptnEvaluationStatus,
}

impl KeptnEvaluation {
    /// Objectives that reported Failed, with their results.
    pub fn failed_objectives(&self) -> Vec<(&str, &EvaluationStatusItem)> {
        self.status
            .evaluation_status
            .iter()
            .filter(|(_, item)| item.status.is_failed())
            .map(|(name, item)| (name.as_str(), item))
            .collect()
    }

    pub fn duration(&self) -> Option<Duration> {
        match (self.status.start_time, self.status.end_time) {
            (Some(start), Some(end)) => (end - start).to_std().ok(),
            _ => None,
        }
    }
}
