// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Keptn Lifecycle Core
//!
//! Reconciliation engine that drives app and workload versions through their
//! deployment pipelines.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Phase state machine, run fan-out, version lifecycle and trace continuity

pub mod application;
pub mod domain;
pub mod infrastructure;
