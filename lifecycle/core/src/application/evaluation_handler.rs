// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Evaluation runs: one `KeptnEvaluation` per configured
//! `KeptnEvaluationDefinition`. Objective retries belong to the runner; only
//! the overall verdict is mirrored here.

use crate::application::run_handler::{RunHandler, RunKind};
use crate::domain::phase_item::{PhaseItem, PhaseItemWrapper};
use crate::infrastructure::telemetry::LifecycleMeters;
use keptn_lifecycle_api::evaluation::{KeptnEvaluation, KeptnEvaluationDefinition};
use keptn_lifecycle_api::phase::{CREATE_EVALUATION, RECONCILE_EVALUATION};
use keptn_lifecycle_api::{CheckType, KeptnPhaseType, KeptnState, TraceCarrier};

pub struct EvaluationRuns;

impl RunKind for EvaluationRuns {
    type Definition = KeptnEvaluationDefinition;
    type Run = KeptnEvaluation;

    const NOUN: &'static str = "evaluation";
    const RECONCILE_PHASE: KeptnPhaseType = RECONCILE_EVALUATION;
    const CREATE_PHASE: KeptnPhaseType = CREATE_EVALUATION;

    fn generate(
        item: &PhaseItemWrapper,
        definition: &KeptnEvaluationDefinition,
        check_type: CheckType,
        trace_context: TraceCarrier,
    ) -> KeptnEvaluation {
        item.generate_evaluation(definition, check_type, trace_context)
    }

    fn reported_state(run: &KeptnEvaluation) -> KeptnState {
        run.status.overall_status
    }

    fn failure_details(run: &KeptnEvaluation) -> Vec<String> {
        run.failed_objectives()
            .into_iter()
            .map(|(objective, item)| {
                format!(
                    "evaluation of '{}' failed with value: '{}' and reason: '{}'",
                    objective, item.value, item.message
                )
            })
            .collect()
    }

    fn record(meters: &LifecycleMeters, run: &KeptnEvaluation) {
        meters.record_evaluation(run);
    }
}

pub type EvaluationHandler = RunHandler<EvaluationRuns>;
