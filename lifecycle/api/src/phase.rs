// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Phase Descriptors
//!
//! Static table of the phases an application or workload version passes
//! through, plus the non-pipeline descriptors used to label notifications.
//! Descriptors carry names and classification flags only.
//!
//! # Architecture
//!
//! - **Layer:** API
//! - **Purpose:** Naming of phases for events, spans and status fields

use crate::state::KeptnState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pre- or post-deployment side of a rollout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStage {
    Pre,
    Post,
}

impl DeploymentStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStage::Pre => "pre",
            DeploymentStage::Post => "post",
        }
    }
}

impl fmt::Display for DeploymentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the four run lists a run belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckType {
    #[serde(rename = "pre")]
    PreDeployment,
    #[serde(rename = "post")]
    PostDeployment,
    #[serde(rename = "pre-eval")]
    PreDeploymentEvaluation,
    #[serde(rename = "post-eval")]
    PostDeploymentEvaluation,
}

impl CheckType {
    pub fn task(stage: DeploymentStage) -> Self {
        match stage {
            DeploymentStage::Pre => CheckType::PreDeployment,
            DeploymentStage::Post => CheckType::PostDeployment,
        }
    }

    pub fn evaluation(stage: DeploymentStage) -> Self {
        match stage {
            DeploymentStage::Pre => CheckType::PreDeploymentEvaluation,
            DeploymentStage::Post => CheckType::PostDeploymentEvaluation,
        }
    }

    pub fn stage(&self) -> DeploymentStage {
        match self {
            CheckType::PreDeployment | CheckType::PreDeploymentEvaluation => DeploymentStage::Pre,
            CheckType::PostDeployment | CheckType::PostDeploymentEvaluation => DeploymentStage::Post,
        }
    }

    pub fn is_evaluation(&self) -> bool {
        matches!(
            self,
            CheckType::PreDeploymentEvaluation | CheckType::PostDeploymentEvaluation
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckType::PreDeployment => "pre",
            CheckType::PostDeployment => "post",
            CheckType::PreDeploymentEvaluation => "pre-eval",
            CheckType::PostDeploymentEvaluation => "post-eval",
        }
    }
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseScope {
    App,
    Workload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    Task,
    Evaluation,
    Deployment,
    Bookkeeping,
}

/// A named phase with its classification flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeptnPhaseType {
    pub long_name: &'static str,
    pub short_name: &'static str,
    pub kind: PhaseKind,
    pub stage: Option<DeploymentStage>,
    pub scope: Option<PhaseScope>,
}

impl KeptnPhaseType {
    const fn pipeline(
        long_name: &'static str,
        short_name: &'static str,
        kind: PhaseKind,
        stage: Option<DeploymentStage>,
        scope: PhaseScope,
    ) -> Self {
        Self {
            long_name,
            short_name,
            kind,
            stage,
            scope: Some(scope),
        }
    }

    const fn bookkeeping(long_name: &'static str, short_name: &'static str) -> Self {
        Self {
            long_name,
            short_name,
            kind: PhaseKind::Bookkeeping,
            stage: None,
            scope: None,
        }
    }

    pub fn is_task(&self) -> bool {
        self.kind == PhaseKind::Task
    }

    pub fn is_evaluation(&self) -> bool {
        self.kind == PhaseKind::Evaluation
    }

    pub fn is_deployment(&self) -> bool {
        self.kind == PhaseKind::Deployment
    }

    pub fn is_pre(&self) -> bool {
        self.stage == Some(DeploymentStage::Pre)
    }

    pub fn is_post(&self) -> bool {
        self.stage == Some(DeploymentStage::Post)
    }

    /// Run list a task or evaluation phase reconciles.
    pub fn check_type(&self) -> Option<CheckType> {
        match (self.kind, self.stage) {
            (PhaseKind::Task, Some(stage)) => Some(CheckType::task(stage)),
            (PhaseKind::Evaluation, Some(stage)) => Some(CheckType::evaluation(stage)),
            _ => None,
        }
    }
}

impl fmt::Display for KeptnPhaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.long_name)
    }
}

use DeploymentStage::{Post, Pre};
use PhaseKind::{Deployment, Evaluation, Task};
use PhaseScope::{App, Workload};

pub const APP_PRE_DEPLOYMENT_TASKS: KeptnPhaseType =
    KeptnPhaseType::pipeline("App Pre-Deployment Tasks", "AppPreDeployTasks", Task, Some(Pre), App);
pub const APP_PRE_DEPLOYMENT_EVALUATIONS: KeptnPhaseType = KeptnPhaseType::pipeline(
    "App Pre-Deployment Evaluations",
    "AppPreDeployEvaluations",
    Evaluation,
    Some(Pre),
    App,
);
pub const APP_DEPLOYMENT: KeptnPhaseType =
    KeptnPhaseType::pipeline("App Deployment", "AppDeploy", Deployment, None, App);
pub const APP_POST_DEPLOYMENT_TASKS: KeptnPhaseType = KeptnPhaseType::pipeline(
    "App Post-Deployment Tasks",
    "AppPostDeployTasks",
    Task,
    Some(Post),
    App,
);
pub const APP_POST_DEPLOYMENT_EVALUATIONS: KeptnPhaseType = KeptnPhaseType::pipeline(
    "App Post-Deployment Evaluations",
    "AppPostDeployEvaluations",
    Evaluation,
    Some(Post),
    App,
);

pub const WORKLOAD_PRE_DEPLOYMENT_TASKS: KeptnPhaseType = KeptnPhaseType::pipeline(
    "Workload Pre-Deployment Tasks",
    "WorkloadPreDeployTasks",
    Task,
    Some(Pre),
    Workload,
);
pub const WORKLOAD_PRE_DEPLOYMENT_EVALUATIONS: KeptnPhaseType = KeptnPhaseType::pipeline(
    "Workload Pre-Deployment Evaluations",
    "WorkloadPreDeployEvaluations",
    Evaluation,
    Some(Pre),
    Workload,
);
pub const WORKLOAD_DEPLOYMENT: KeptnPhaseType =
    KeptnPhaseType::pipeline("Workload Deployment", "WorkloadDeploy", Deployment, None, Workload);
pub const WORKLOAD_POST_DEPLOYMENT_TASKS: KeptnPhaseType = KeptnPhaseType::pipeline(
    "Workload Post-Deployment Tasks",
    "WorkloadPostDeployTasks",
    Task,
    Some(Post),
    Workload,
);
pub const WORKLOAD_POST_DEPLOYMENT_EVALUATIONS: KeptnPhaseType = KeptnPhaseType::pipeline(
    "Workload Post-Deployment Evaluations",
    "WorkloadPostDeployEvaluations",
    Evaluation,
    Some(Post),
    Workload,
);

pub const RECONCILE_TASK: KeptnPhaseType = KeptnPhaseType::bookkeeping("Reconcile Task", "ReconcileTask");
pub const RECONCILE_EVALUATION: KeptnPhaseType =
    KeptnPhaseType::bookkeeping("Reconcile Evaluation", "ReconcileEvaluation");
pub const RECONCILE_WORKLOAD: KeptnPhaseType =
    KeptnPhaseType::bookkeeping("Reconcile Workload", "ReconcileWorkload");
pub const CREATE_TASK: KeptnPhaseType = KeptnPhaseType::bookkeeping("Create Task", "CreateTask");
pub const CREATE_EVALUATION: KeptnPhaseType =
    KeptnPhaseType::bookkeeping("Create Evaluation", "CreateEvaluation");
pub const CREATE_APP_VERSION: KeptnPhaseType =
    KeptnPhaseType::bookkeeping("Create AppVersion", "CreateAppVersion");
pub const CREATE_WORKLOAD_VERSION: KeptnPhaseType =
    KeptnPhaseType::bookkeeping("Create WorkloadVersion", "CreateWorkloadVersion");
pub const DEPRECATE_APP_VERSION: KeptnPhaseType =
    KeptnPhaseType::bookkeeping("Deprecate AppVersion", "DeprecateAppVersion");
pub const APP_COMPLETED: KeptnPhaseType = KeptnPhaseType::bookkeeping("App Completed", "AppCompleted");
pub const WORKLOAD_COMPLETED: KeptnPhaseType =
    KeptnPhaseType::bookkeeping("Workload Completed", "WorkloadCompleted");
pub const PHASE_COMPLETED: KeptnPhaseType = KeptnPhaseType::bookkeeping("Completed", "Completed");
pub const PHASE_DEPRECATED: KeptnPhaseType = KeptnPhaseType::bookkeeping("Deprecated", "Deprecated");

/// Application pipeline in execution order.
pub const APP_PIPELINE: [KeptnPhaseType; 5] = [
    APP_PRE_DEPLOYMENT_TASKS,
    APP_PRE_DEPLOYMENT_EVALUATIONS,
    APP_DEPLOYMENT,
    APP_POST_DEPLOYMENT_TASKS,
    APP_POST_DEPLOYMENT_EVALUATIONS,
];

/// Workload pipeline in execution order.
pub const WORKLOAD_PIPELINE: [KeptnPhaseType; 5] = [
    WORKLOAD_PRE_DEPLOYMENT_TASKS,
    WORKLOAD_PRE_DEPLOYMENT_EVALUATIONS,
    WORKLOAD_DEPLOYMENT,
    WORKLOAD_POST_DEPLOYMENT_TASKS,
    WORKLOAD_POST_DEPLOYMENT_EVALUATIONS,
];

const ALL_PHASES: [KeptnPhaseType; 22] = [
    APP_PRE_DEPLOYMENT_TASKS,
    APP_PRE_DEPLOYMENT_EVALUATIONS,
    APP_DEPLOYMENT,
    APP_POST_DEPLOYMENT_TASKS,
    APP_POST_DEPLOYMENT_EVALUATIONS,
    WORKLOAD_PRE_DEPLOYMENT_TASKS,
    WORKLOAD_PRE_DEPLOYMENT_EVALUATIONS,
    WORKLOAD_DEPLOYMENT,
    WORKLOAD_POST_DEPLOYMENT_TASKS,
    WORKLOAD_POST_DEPLOYMENT_EVALUATIONS,
    RECONCILE_TASK,
    RECONCILE_EVALUATION,
    RECONCILE_WORKLOAD,
    CREATE_TASK,
    CREATE_EVALUATION,
    CREATE_APP_VERSION,
    CREATE_WORKLOAD_VERSION,
    DEPRECATE_APP_VERSION,
    APP_COMPLETED,
    WORKLOAD_COMPLETED,
    PHASE_COMPLETED,
    PHASE_DEPRECATED,
];

/// Resolves a short or long phase name to its descriptor.
pub fn find_phase(name: &str) -> Option<KeptnPhaseType> {
    ALL_PHASES
        .iter()
        .find(|phase| phase.short_name == name || phase.long_name == name)
        .copied()
}

/// Short name for `name`, or `name` itself when it is not a known phase.
pub fn get_short_phase_name(name: &str) -> &str {
    find_phase(name).map(|phase| phase.short_name).unwrap_or(name)
}

/// Phases that follow `phase` in its pipeline.
pub fn phases_after(phase: &KeptnPhaseType) -> &'static [KeptnPhaseType] {
    let pipeline: &'static [KeptnPhaseType] = match phase.scope {
        Some(PhaseScope::App) => &APP_PIPELINE,
        Some(PhaseScope::Workload) => &WORKLOAD_PIPELINE,
        None => return &[],
    };
    match pipeline.iter().position(|p| p == phase) {
        Some(idx) => &pipeline[idx + 1..],
        None => &[],
    }
}

/// Marks the phases of `pipeline` that can no longer run and returns the
/// overall state the entity ends up in.
///
/// `states` holds the stored phase statuses in pipeline order. After a failure
/// of `from`, every later phase that is not yet completed becomes Cancelled and
/// the entity Failed. With [`PHASE_DEPRECATED`] every uncompleted phase becomes
/// Deprecated, as does the entity. Completed phases are never touched.
pub fn cascade_remaining_phases(
    pipeline: &[KeptnPhaseType; 5],
    states: [&mut KeptnState; 5],
    from: &KeptnPhaseType,
) -> KeptnState {
    if *from == PHASE_DEPRECATED {
        for state in states {
            if !state.is_completed() {
                *state = KeptnState::Deprecated;
            }
        }
        return KeptnState::Deprecated;
    }

    if let Some(idx) = pipeline.iter().position(|phase| phase == from) {
        for state in states.into_iter().skip(idx + 1) {
            if !state.is_completed() {
                *state = KeptnState::Cancelled;
            }
        }
    }
    KeptnState::Failed
}
