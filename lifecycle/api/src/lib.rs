// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Keptn Lifecycle API
//!
//! Stored records and pure rules of the lifecycle engine: the state
//! vocabulary and its aggregation, the phase table, and run naming.
//!
//! # Architecture
//!
//! - **Layer:** API
//! - **Purpose:** Shared schema for the engine and its collaborators

pub mod app;
pub mod evaluation;
pub mod item_status;
pub mod meta;
pub mod naming;
pub mod phase;
pub mod state;
pub mod task;
pub mod workload;

pub use item_status::{CheckDefinitions, ItemStatus, RunStatusLists};
pub use meta::{ObjectKey, ObjectMeta, TraceCarrier};
pub use phase::{CheckType, DeploymentStage, KeptnPhaseType};
pub use state::{get_overall_state, update_status_summary, KeptnState, StatusSummary};
