// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Task Records
//!
//! A `KeptnTaskDefinition` is a reusable template; a `KeptnTask` is the
//! one-shot run created from it for a single version record. The engine only
//! creates tasks and reads their reported status.

use crate::meta::{ObjectMeta, TraceCarrier};
use crate::phase::CheckType;
use crate::state::KeptnState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeptnTaskDefinitionSpec {
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub retries: Option<u32>,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeptnTaskDefinition {
    pub metadata: ObjectMeta,
    pub spec: KeptnTaskDefinitionSpec,
}

/// Kind of record a run was created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    App,
    Workload,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::App => "App",
            ObjectType::Workload => "Workload",
        }
    }
}

/// Identity of the version record a run belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunContext {
    pub app_name: String,
    pub app_version: String,
    #[serde(default)]
    pub workload_name: String,
    #[serde(default)]
    pub workload_version: String,
    pub object_type: ObjectType,
    pub task_type: CheckType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeptnTaskSpec {
    pub task_definition: String,
    pub context: RunContext,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    pub check_type: CheckType,
    #[serde(default)]
    pub retries: Option<u32>,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    #[serde(default)]
    pub trace_context: TraceCarrier,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeptnTaskStatus {
    #[serde(default)]
    pub status: KeptnState,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeptnTask {
    pub metadata: ObjectMeta,
    pub spec: KeptnTaskSpec,
    #[serde(default)]
    pub status: KeptnTaskStatus,
}

impl KeptnTask {
    /// Run duration once the runner reported both timestamps.
    pub fn duration(&self) -> Option<Duration> {
        match (self.status.start_time, self.status.end_time) {
            (Some(start), Some(end)) => (end - start).to_std().ok(),
            _ => None,
        }
    }
}
