// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Shared fixtures for the lifecycle integration tests: an in-memory store
//! that counts reads and creations and can inject backend faults, a span handler that counts unbinds, an
//! event bus and a reported deployment probe wired into one engine context.

#![allow(dead_code)]

use async_trait::async_trait;
use keptn_lifecycle_api::app::{KeptnApp, KeptnAppSpec, KeptnAppVersion, KeptnAppVersionSpec, KeptnWorkloadRef};
use keptn_lifecycle_api::evaluation::KeptnEvaluationDefinition;
use keptn_lifecycle_api::task::KeptnTaskDefinition;
use keptn_lifecycle_api::workload::{KeptnWorkload, KeptnWorkloadSpec, ResourceReference};
use keptn_lifecycle_api::{CheckDefinitions, ObjectKey, ObjectMeta};
use keptn_lifecycle_core::application::{EngineContext, LifecycleEngine};
use keptn_lifecycle_core::domain::config::LifecycleConfig;
use keptn_lifecycle_core::domain::events::{EventReason, LifecycleEvent};
use keptn_lifecycle_core::domain::object::{LifecycleObject, ObjectKind};
use keptn_lifecycle_core::domain::repository::{ObjectStore, StoreError};
use keptn_lifecycle_core::domain::span::{SpanHandler, SpanItem};
use keptn_lifecycle_core::infrastructure::deployment_probe::ReportedDeploymentProbe;
use keptn_lifecycle_core::infrastructure::event_bus::EventBus;
use keptn_lifecycle_core::infrastructure::repositories::InMemoryObjectStore;
use keptn_lifecycle_core::infrastructure::telemetry::{LifecycleTracer, SpanCache};
use opentelemetry::trace::Link;
use opentelemetry::Context;
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const NS: &str = "demo";
pub const APP: &str = "podtato";

/// Store wrapper recording how often each kind was read and created.
/// Faults armed through `fail_next_list`, `fail_next_get` and
/// `reject_creates` are returned instead of reaching the inner store.
#[derive(Default)]
pub struct CountingStore {
    pub inner: InMemoryObjectStore,
    gets: Mutex<HashMap<ObjectKind, usize>>,
    creates: Mutex<HashMap<ObjectKind, usize>>,
    failing_lists: Mutex<HashSet<ObjectKind>>,
    failing_gets: Mutex<HashSet<ObjectKind>>,
    rejected_creates: Mutex<HashSet<ObjectKind>>,
}

impl CountingStore {
    /// The next `list` of `kind` fails with a backend error.
    pub fn fail_next_list(&self, kind: ObjectKind) {
        self.failing_lists.lock().insert(kind);
    }

    /// The next `get` of `kind` fails with a backend error.
    pub fn fail_next_get(&self, kind: ObjectKind) {
        self.failing_gets.lock().insert(kind);
    }

    /// Every `create` of `kind` reports the name as taken.
    pub fn reject_creates(&self, kind: ObjectKind) {
        self.rejected_creates.lock().insert(kind);
    }

    pub fn gets(&self, kind: ObjectKind) -> usize {
        self.gets.lock().get(&kind).copied().unwrap_or(0)
    }

    pub fn creates(&self, kind: ObjectKind) -> usize {
        self.creates.lock().get(&kind).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ObjectStore for CountingStore {
    async fn get(&self, kind: ObjectKind, key: &ObjectKey) -> Result<LifecycleObject, StoreError> {
        *self.gets.lock().entry(kind).or_default() += 1;
        if self.failing_gets.lock().remove(&kind) {
            return Err(StoreError::Backend("transient".to_string()));
        }
        self.inner.get(kind, key).await
    }

    async fn list(&self, kind: ObjectKind, namespace: &str) -> Result<Vec<LifecycleObject>, StoreError> {
        if self.failing_lists.lock().remove(&kind) {
            return Err(StoreError::Backend("transient".to_string()));
        }
        self.inner.list(kind, namespace).await
    }

    async fn create(&self, object: LifecycleObject) -> Result<LifecycleObject, StoreError> {
        let kind = object.kind();
        *self.creates.lock().entry(kind).or_default() += 1;
        if self.rejected_creates.lock().contains(&kind) {
            return Err(StoreError::AlreadyExists { kind, key: object.key() });
        }
        self.inner.create(object).await
    }

    async fn update_status(&self, object: &LifecycleObject) -> Result<(), StoreError> {
        self.inner.update_status(object).await
    }
}

/// Span cache wrapper recording unbinds per span key.
pub struct CountingSpans {
    pub inner: SpanCache,
    unbinds: Mutex<HashMap<String, usize>>,
}

impl CountingSpans {
    pub fn new(tracer: LifecycleTracer) -> Self {
        Self {
            inner: SpanCache::new(tracer),
            unbinds: Mutex::new(HashMap::new()),
        }
    }

    pub fn unbind_count(&self, item: &dyn SpanItem, phase: &str) -> usize {
        self.unbinds.lock().get(&item.span_key(phase)).copied().unwrap_or(0)
    }

    pub fn is_bound(&self, item: &dyn SpanItem, phase: &str) -> bool {
        self.inner.is_bound(item, phase)
    }
}

impl SpanHandler for CountingSpans {
    fn get_span(&self, parent: &Context, item: &dyn SpanItem, phase: &str, links: Vec<Link>) -> Context {
        self.inner.get_span(parent, item, phase, links)
    }

    fn unbind_span(&self, item: &dyn SpanItem, phase: &str) {
        *self.unbinds.lock().entry(item.span_key(phase)).or_default() += 1;
        self.inner.unbind_span(item, phase);
    }
}

pub struct Harness {
    pub store: Arc<CountingStore>,
    pub spans: Arc<CountingSpans>,
    pub bus: Arc<EventBus>,
    pub probe: Arc<ReportedDeploymentProbe>,
    pub ctx: EngineContext,
    /// Spans ended during the test.
    pub exporter: InMemorySpanExporter,
    _provider: SdkTracerProvider,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(LifecycleConfig::default())
    }

    pub fn with_config(config: LifecycleConfig) -> Self {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        let tracer = LifecycleTracer::new(&provider);
        let store = Arc::new(CountingStore::default());
        let spans = Arc::new(CountingSpans::new(tracer.clone()));
        let bus = Arc::new(EventBus::with_default_capacity());
        let ctx = EngineContext::new(store.clone(), bus.clone(), spans.clone(), tracer, config);
        Self {
            store,
            spans,
            bus,
            probe: Arc::new(ReportedDeploymentProbe::new()),
            ctx,
            exporter,
            _provider: provider,
        }
    }

    pub fn engine(&self) -> LifecycleEngine {
        LifecycleEngine::new(self.ctx.clone(), self.probe.clone())
    }
}

pub fn task_definition(namespace: &str, name: &str) -> KeptnTaskDefinition {
    KeptnTaskDefinition {
        metadata: ObjectMeta::new(namespace, name),
        spec: Default::default(),
    }
}

pub fn evaluation_definition(namespace: &str, name: &str) -> KeptnEvaluationDefinition {
    KeptnEvaluationDefinition {
        metadata: ObjectMeta::new(namespace, name),
        spec: Default::default(),
    }
}

pub fn frontend_ref(version: &str) -> KeptnWorkloadRef {
    KeptnWorkloadRef {
        name: "frontend".to_string(),
        version: version.to_string(),
    }
}

pub fn app(version: &str, generation: i64, workloads: Vec<KeptnWorkloadRef>) -> KeptnApp {
    let mut metadata = ObjectMeta::new(NS, APP);
    metadata.generation = generation;
    KeptnApp {
        metadata,
        spec: KeptnAppSpec {
            version: version.to_string(),
            workloads,
            checks: CheckDefinitions::default(),
        },
        status: Default::default(),
    }
}

/// App version as the version creator would produce it, without a trace root.
pub fn app_version(version: &str, checks: CheckDefinitions, workloads: Vec<KeptnWorkloadRef>) -> KeptnAppVersion {
    let source = app(version, 1, workloads);
    KeptnAppVersion {
        metadata: ObjectMeta::new(NS, source.app_version_name()),
        spec: KeptnAppVersionSpec {
            app: KeptnAppSpec { checks, ..source.spec },
            app_name: APP.to_string(),
            revision: 1,
            ..Default::default()
        },
        status: Default::default(),
    }
}

pub fn frontend_resource() -> ResourceReference {
    ResourceReference {
        kind: "ReplicaSet".to_string(),
        name: "podtato-frontend-7d9c".to_string(),
    }
}

pub fn frontend_workload(version: &str) -> KeptnWorkload {
    KeptnWorkload {
        metadata: ObjectMeta::new(NS, format!("{}-frontend", APP)),
        spec: KeptnWorkloadSpec {
            app_name: APP.to_string(),
            version: version.to_string(),
            resource_reference: frontend_resource(),
            checks: CheckDefinitions::default(),
        },
        status: Default::default(),
    }
}

pub fn count_reason(events: &[LifecycleEvent], reason: EventReason) -> usize {
    events.iter().filter(|e| e.reason == reason).count()
}

/// Trace id segment of a W3C `traceparent` value.
pub fn trace_id_of(traceparent: &str) -> &str {
    traceparent.split('-').nth(1).unwrap_or_default()
}
