// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Engine Context
//!
//! Collaborators every reconcile path is constructed with. Nothing here is
//! global: the embedding process builds one context and hands clones to the
//! use cases it wires up.

use crate::domain::config::LifecycleConfig;
use crate::domain::events::EventSender;
use crate::domain::repository::ObjectStore;
use crate::domain::span::SpanHandler;
use crate::infrastructure::telemetry::{LifecycleMeters, LifecycleTracer};
use std::sync::Arc;

#[derive(Clone)]
pub struct EngineContext {
    pub store: Arc<dyn ObjectStore>,
    pub events: Arc<dyn EventSender>,
    pub spans: Arc<dyn SpanHandler>,
    pub tracer: LifecycleTracer,
    pub meters: LifecycleMeters,
    pub config: LifecycleConfig,
}

impl EngineContext {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        events: Arc<dyn EventSender>,
        spans: Arc<dyn SpanHandler>,
        tracer: LifecycleTracer,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            store,
            events,
            spans,
            tracer,
            meters: LifecycleMeters,
            config,
        }
    }
}
