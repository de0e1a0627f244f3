// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Outcome of one reconcile call, honored by the external scheduler.

use std::time::Duration;

/// What the scheduler should do after a successful reconcile call. Errors
/// travel separately as `Err(EngineError)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Nothing outstanding; wait for the next change notification.
    Done,
    RequeueAfter(Duration),
}

impl ReconcileAction {
    pub fn requeue_after(&self) -> Option<Duration> {
        match self {
            ReconcileAction::Done => None,
            ReconcileAction::RequeueAfter(delay) => Some(*delay),
        }
    }
}

/// Verdict of the phase state machine for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseResult {
    /// The phase succeeded and the next one may start in the same call.
    pub proceed: bool,
    pub action: ReconcileAction,
}

impl PhaseResult {
    pub fn stop() -> Self {
        Self {
            proceed: false,
            action: ReconcileAction::Done,
        }
    }

    pub fn retry(delay: Duration) -> Self {
        Self {
            proceed: false,
            action: ReconcileAction::RequeueAfter(delay),
        }
    }

    pub fn proceed() -> Self {
        Self {
            proceed: true,
            action: ReconcileAction::Done,
        }
    }
}
