// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Per-definition run bookkeeping stored on a version record.

use crate::phase::CheckType;
use crate::state::KeptnState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of the run created for one definition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStatus {
    pub definition_name: String,
    /// Name of the child run; empty until the run is created.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: KeptnState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl ItemStatus {
    pub fn pending(definition_name: impl Into<String>) -> Self {
        Self {
            definition_name: definition_name.into(),
            ..Default::default()
        }
    }

    pub fn set_start_time(&mut self) {
        if self.start_time.is_none() {
            self.start_time = Some(Utc::now());
        }
    }

    pub fn set_end_time(&mut self) {
        if self.end_time.is_none() {
            self.end_time = Some(Utc::now());
        }
    }

    pub fn has_run(&self) -> bool {
        !self.name.is_empty()
    }
}

/// The four run lists of a version record, one per [`CheckType`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatusLists {
    #[serde(default)]
    pub pre_deployment_task_status: Vec<ItemStatus>,
    #[serde(default)]
    pub post_deployment_task_status: Vec<ItemStatus>,
    #[serde(default)]
    pub pre_deployment_evaluation_task_status: Vec<ItemStatus>,
    #[serde(default)]
    pub post_deployment_evaluation_task_status: Vec<ItemStatus>,
}

impl RunStatusLists {
    pub fn get(&self, check_type: CheckType) -> &[ItemStatus] {
        match check_type {
            CheckType::PreDeployment => &self.pre_deployment_task_status,
            CheckType::PostDeployment => &self.post_deployment_task_status,
            CheckType::PreDeploymentEvaluation => &self.pre_deployment_evaluation_task_status,
            CheckType::PostDeploymentEvaluation => &self.post_deployment_evaluation_task_status,
        }
    }

    pub fn set(&mut self, check_type: CheckType, statuses: Vec<ItemStatus>) {
        match check_type {
            CheckType::PreDeployment => self.pre_deployment_task_status = statuses,
            CheckType::PostDeployment => self.post_deployment_task_status = statuses,
            CheckType::PreDeploymentEvaluation => self.pre_deployment_evaluation_task_status = statuses,
            CheckType::PostDeploymentEvaluation => self.post_deployment_evaluation_task_status = statuses,
        }
    }
}

/// Definition names of a spec, one list per [`CheckType`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckDefinitions {
    #[serde(default)]
    pub pre_deployment_tasks: Vec<String>,
    #[serde(default)]
    pub post_deployment_tasks: Vec<String>,
    #[serde(default)]
    pub pre_deployment_evaluations: Vec<String>,
    #[serde(default)]
    pub post_deployment_evaluations: Vec<String>,
}

impl CheckDefinitions {
    pub fn get(&self, check_type: CheckType) -> &[String] {
        match check_type {
            CheckType::PreDeployment => &self.pre_deployment_tasks,
            CheckType::PostDeployment => &self.post_deployment_tasks,
            CheckType::PreDeploymentEvaluation => &self.pre_deployment_evaluations,
            CheckType::PostDeploymentEvaluation => &self.post_deployment_evaluations,
        }
    }
}

/// Recorded status for `definition_name`, if any.
pub fn find_item_status<'a>(statuses: &'a [ItemStatus], definition_name: &str) -> Option<&'a ItemStatus> {
    statuses.iter().find(|s| s.definition_name == definition_name)
}
