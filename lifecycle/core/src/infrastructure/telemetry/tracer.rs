// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Explicitly constructed tracer and W3C trace-context propagation.

use keptn_lifecycle_api::TraceCarrier;
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::{Link, TraceContextExt, TracerProvider as _};
use opentelemetry::Context;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};

pub const INSTRUMENTATION_SCOPE: &str = "keptn/lifecycle-engine";

/// Tracer handed to every component at construction time.
#[derive(Clone, Debug)]
pub struct LifecycleTracer {
    tracer: SdkTracer,
    propagator: TraceContextPropagator,
}

impl LifecycleTracer {
    pub fn new(provider: &SdkTracerProvider) -> Self {
        Self {
            tracer: provider.tracer(INSTRUMENTATION_SCOPE),
            propagator: TraceContextPropagator::new(),
        }
    }

    pub fn tracer(&self) -> &SdkTracer {
        &self.tracer
    }

    pub fn inject(&self, cx: &Context) -> TraceCarrier {
        let mut carrier = TraceCarrier::new();
        self.propagator.inject_context(cx, &mut carrier);
        carrier
    }

    pub fn extract(&self, carrier: &TraceCarrier) -> Context {
        self.propagator.extract(carrier)
    }

    /// Link to the span described by `carrier`, if it holds a valid context.
    pub fn link_to(&self, carrier: &TraceCarrier) -> Option<Link> {
        let cx = self.extract(carrier);
        let span_context = cx.span().span_context().clone();
        span_context.is_valid().then(|| Link::with_context(span_context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{Span, Tracer};

    #[test]
    fn test_inject_extract_roundtrip() {
        let provider = SdkTracerProvider::builder().build();
        let tracer = LifecycleTracer::new(&provider);
        let span = tracer.tracer().start("rollout");
        let trace_id = span.span_context().trace_id();
        let cx = Context::new().with_span(span);

        let carrier = tracer.inject(&cx);
        assert!(carrier.contains_key("traceparent"));

        let extracted = tracer.extract(&carrier);
        assert_eq!(extracted.span().span_context().trace_id(), trace_id);
        assert!(tracer.link_to(&carrier).is_some());
        assert!(tracer.link_to(&TraceCarrier::new()).is_none());
    }
}
