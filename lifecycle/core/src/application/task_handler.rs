// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Task runs: one `KeptnTask` per configured `KeptnTaskDefinition`.

use crate::application::run_handler::{RunHandler, RunKind};
use crate::domain::phase_item::{PhaseItem, PhaseItemWrapper};
use crate::infrastructure::telemetry::LifecycleMeters;
use keptn_lifecycle_api::phase::{CREATE_TASK, RECONCILE_TASK};
use keptn_lifecycle_api::task::{KeptnTask, KeptnTaskDefinition};
use keptn_lifecycle_api::{CheckType, KeptnPhaseType, KeptnState, TraceCarrier};

pub struct TaskRuns;

impl RunKind for TaskRuns {
    type Definition = KeptnTaskDefinition;
    type Run = KeptnTask;

    const NOUN: &'static str = "task";
    const RECONCILE_PHASE: KeptnPhaseType = RECONCILE_TASK;
    const CREATE_PHASE: KeptnPhaseType = CREATE_TASK;

    fn generate(
        item: &PhaseItemWrapper,
        definition: &KeptnTaskDefinition,
        check_type: CheckType,
        trace_context: TraceCarrier,
    ) -> KeptnTask {
        item.generate_task(definition, check_type, trace_context)
    }

    fn reported_state(run: &KeptnTask) -> KeptnState {
        run.status.status
    }

    fn failure_details(run: &KeptnTask) -> Vec<String> {
        if run.status.message.is_empty() {
            Vec::new()
        } else {
            vec![run.status.message.clone()]
        }
    }

    fn record(meters: &LifecycleMeters, run: &KeptnTask) {
        meters.record_task(run);
    }
}

pub type TaskHandler = RunHandler<TaskRuns>;
