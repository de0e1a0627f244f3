// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Lifecycle State & Aggregation
//!
//! `KeptnState` is the single status vocabulary shared by entities, phases and
//! runs. `StatusSummary` folds many run states into one phase verdict.
//!
//! # Architecture
//!
//! - **Layer:** API
//! - **Purpose:** Pure classification and aggregation, no I/O

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an entity, a phase, or a single run.
///
/// An unset status deserializes as [`KeptnState::Pending`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum KeptnState {
    #[default]
    #[serde(alias = "")]
    Pending,
    Progressing,
    Succeeded,
    Failed,
    Cancelled,
    Unknown,
    Deprecated,
}

impl KeptnState {
    pub const ALL: [KeptnState; 7] = [
        KeptnState::Pending,
        KeptnState::Progressing,
        KeptnState::Succeeded,
        KeptnState::Failed,
        KeptnState::Cancelled,
        KeptnState::Unknown,
        KeptnState::Deprecated,
    ];

    /// True once the state can no longer change.
    pub fn is_completed(&self) -> bool {
        matches!(
            self,
            KeptnState::Succeeded | KeptnState::Failed | KeptnState::Cancelled | KeptnState::Deprecated
        )
    }

    pub fn is_succeeded(&self) -> bool {
        *self == KeptnState::Succeeded
    }

    pub fn is_failed(&self) -> bool {
        *self == KeptnState::Failed
    }

    pub fn is_cancelled(&self) -> bool {
        *self == KeptnState::Cancelled
    }

    pub fn is_pending(&self) -> bool {
        *self == KeptnState::Pending
    }

    pub fn is_deprecated(&self) -> bool {
        *self == KeptnState::Deprecated
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeptnState::Pending => "Pending",
            KeptnState::Progressing => "Progressing",
            KeptnState::Succeeded => "Succeeded",
            KeptnState::Failed => "Failed",
            KeptnState::Cancelled => "Cancelled",
            KeptnState::Unknown => "Unknown",
            KeptnState::Deprecated => "Deprecated",
        }
    }
}

impl fmt::Display for KeptnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bucketed counters over the runs of one phase.
///
/// `total` is the declared number of expected runs and is owned by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusSummary {
    pub total: usize,
    pub progressing: usize,
    pub failed: usize,
    pub succeeded: usize,
    pub pending: usize,
    pub unknown: usize,
    pub cancelled: usize,
}

impl StatusSummary {
    pub fn with_total(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Sum of every bucket, excluding `total`.
    pub fn counted(&self) -> usize {
        self.progressing + self.failed + self.succeeded + self.pending + self.unknown + self.cancelled
    }

    pub fn overall_state(&self) -> KeptnState {
        get_overall_state(self)
    }
}

/// Returns a copy of `summary` with the bucket for `state` incremented.
///
/// Deprecated runs share the cancelled bucket.
pub fn update_status_summary(state: KeptnState, summary: StatusSummary) -> StatusSummary {
    let mut next = summary;
    match state {
        KeptnState::Pending => next.pending += 1,
        KeptnState::Progressing => next.progressing += 1,
        KeptnState::Succeeded => next.succeeded += 1,
        KeptnState::Failed => next.failed += 1,
        KeptnState::Cancelled | KeptnState::Deprecated => next.cancelled += 1,
        KeptnState::Unknown => next.unknown += 1,
    }
    next
}

/// Reduces a summary to one verdict. Failure dominates, then in-flight work,
/// then unresolved health, then work not yet started.
pub fn get_overall_state(summary: &StatusSummary) -> KeptnState {
    if summary.failed > 0 || summary.cancelled > 0 {
        return KeptnState::Failed;
    }
    if summary.progressing > 0 {
        return KeptnState::Progressing;
    }
    if summary.unknown > 0 {
        return KeptnState::Unknown;
    }
    if summary.pending > 0 {
        return KeptnState::Pending;
    }
    KeptnState::Succeeded
}
