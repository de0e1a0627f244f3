// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Tracing, span continuity, metrics and log setup.

pub mod logging;
pub mod metrics;
pub mod span_cache;
pub mod tracer;

pub use logging::init_logging;
pub use metrics::{ActiveCounts, ActiveInstancesCollector, LifecycleMeters};
pub use span_cache::SpanCache;
pub use tracer::LifecycleTracer;
