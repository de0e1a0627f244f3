// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Span Continuity Cache
//!
//! A phase stays open across many reconcile calls, so its span is started
//! once and looked up again by key on every later call. The cache is
//! process-local; after a restart phases simply get a fresh span.

use super::tracer::LifecycleTracer;
use crate::domain::span::{SpanHandler, SpanItem};
use dashmap::DashMap;
use opentelemetry::trace::{Link, SpanKind, TraceContextExt, Tracer};
use opentelemetry::Context;
use tracing::debug;

pub struct SpanCache {
    tracer: LifecycleTracer,
    bindings: DashMap<String, Context>,
}

impl SpanCache {
    pub fn new(tracer: LifecycleTracer) -> Self {
        Self {
            tracer,
            bindings: DashMap::new(),
        }
    }

    pub fn is_bound(&self, item: &dyn SpanItem, phase: &str) -> bool {
        self.bindings.contains_key(&item.span_key(phase))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl SpanHandler for SpanCache {
    fn get_span(&self, parent: &Context, item: &dyn SpanItem, phase: &str, links: Vec<Link>) -> Context {
        let key = item.span_key(phase);
        if let Some(cx) = self.bindings.get(&key) {
            return cx.clone();
        }

        let binding = self.bindings.entry(key).or_insert_with(|| {
            let tracer = self.tracer.tracer();
            let span = tracer
                .span_builder(item.span_name(phase))
                .with_kind(SpanKind::Consumer)
                .with_attributes(item.span_attributes())
                .with_links(links)
                .start_with_context(tracer, parent);
            debug!(phase = %phase, "Started span");
            parent.with_span(span)
        });
        binding.value().clone()
    }

    fn unbind_span(&self, item: &dyn SpanItem, phase: &str) {
        self.bindings.remove(&item.span_key(phase));
    }
}
