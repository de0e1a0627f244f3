// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod deployment_probe;
pub mod event_bus;
pub mod repositories;
pub mod telemetry;
