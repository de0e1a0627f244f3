// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Records, contracts and error types of the lifecycle engine.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Types and traits shared by the application and infrastructure layers

pub mod config;
pub mod deployment;
pub mod errors;
pub mod events;
pub mod object;
pub mod phase_item;
pub mod reconcile;
pub mod repository;
pub mod span;
