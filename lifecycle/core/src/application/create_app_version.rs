// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Create App Version Use Case
//!
//! Observes a `KeptnApp` and makes sure exactly one `KeptnAppVersion` exists
//! for its current spec generation. When the generation moved past 1, the
//! in-flight versions of earlier generations are deprecated so that only the
//! newest rollout keeps running.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Create-once and deprecate-superseded for app versions
//! - **Collaborators:**
//!   - Domain: ObjectStore, EventSender, SpanHandler
//!   - Infrastructure: LifecycleTracer

use crate::application::context::EngineContext;
use crate::domain::errors::EngineError;
use crate::domain::events::{EventReason, EventType};
use crate::domain::object::ObjectRef;
use crate::domain::phase_item::PhaseItem;
use crate::domain::reconcile::ReconcileAction;
use crate::domain::repository::StoreExt;
use crate::domain::span::{APP_NAME, APP_NAMESPACE, APP_PREVIOUS_VERSION, APP_VERSION};
use keptn_lifecycle_api::app::{KeptnApp, KeptnAppVersion, KeptnAppVersionSpec};
use keptn_lifecycle_api::phase::{APP_PIPELINE, CREATE_APP_VERSION, DEPRECATE_APP_VERSION, PHASE_DEPRECATED};
use keptn_lifecycle_api::{ObjectKey, ObjectMeta, TraceCarrier};
use opentelemetry::trace::{Span, SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue};
use tracing::{debug, info, warn};

/// Annotation keys carrying the inbound W3C trace context of a spec.
pub(crate) const TRACE_ANNOTATIONS: [&str; 2] = ["traceparent", "tracestate"];

/// Inbound trace context stored in the annotations of a spec, if any.
pub(crate) fn inbound_carrier(meta: &ObjectMeta) -> Option<TraceCarrier> {
    let carrier: TraceCarrier = TRACE_ANNOTATIONS
        .iter()
        .filter_map(|key| meta.annotations.get(*key).map(|value| (key.to_string(), value.clone())))
        .collect();
    carrier.contains_key("traceparent").then_some(carrier)
}

/// Version string recorded as the predecessor of a new rollout. Empty for the
/// first rollout and when the version string did not change.
pub(crate) fn previous_version(spec_version: &str, current_version: &str) -> String {
    if spec_version != current_version {
        current_version.to_string()
    } else {
        String::new()
    }
}

pub struct AppVersionCreator {
    ctx: EngineContext,
}

impl AppVersionCreator {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileAction, EngineError> {
        let mut app = match self.ctx.store.get_as::<KeptnApp>(key).await {
            Ok(app) => app,
            Err(e) if e.is_not_found() => {
                debug!(key = %key, "App is gone");
                return Ok(ReconcileAction::Done);
            }
            Err(e) => return Err(e.into()),
        };

        let version_key = ObjectKey::new(&app.metadata.namespace, app.app_version_name());
        let exists = match self.ctx.store.get_as::<KeptnAppVersion>(&version_key).await {
            Ok(_) => true,
            Err(e) if e.is_not_found() => false,
            Err(e) => return Err(e.into()),
        };

        if !exists {
            self.create_app_version(&app).await?;
        }

        if app.status.current_version != app.spec.version {
            app.status.current_version = app.spec.version.clone();
            self.ctx.store.update_status_as(&app).await?;
        }

        // runs on every pass so a failed deprecation is picked up by the retry
        if app.metadata.generation > 1 {
            self.deprecate_superseded(&app).await?;
        }
        Ok(ReconcileAction::Done)
    }

    async fn create_app_version(&self, app: &KeptnApp) -> Result<(), EngineError> {
        info!(app = %app.metadata.name, version = %app.spec.version, generation = app.metadata.generation, "Creating app version");
        let version = self.generate_app_version(app);
        match self.ctx.store.create_as(version.clone()).await {
            Ok(_) => {
                self.ctx.events.emit(
                    &CREATE_APP_VERSION,
                    EventType::Normal,
                    &ObjectRef::of(&version),
                    EventReason::AppVersionCreated,
                    "created",
                    &version.spec.app.version,
                );
                Ok(())
            }
            Err(e) if e.is_already_exists() => {
                debug!(app_version = %version.metadata.name, "App version already created");
                Ok(())
            }
            Err(e) => {
                warn!(app_version = %version.metadata.name, error = %e, "Could not create app version");
                self.ctx.events.emit(
                    &CREATE_APP_VERSION,
                    EventType::Warning,
                    &ObjectRef::of(&version),
                    EventReason::Failed,
                    "could not create KeptnAppVersion",
                    &version.spec.app.version,
                );
                Err(e.into())
            }
        }
    }

    fn generate_app_version(&self, app: &KeptnApp) -> KeptnAppVersion {
        let previous_version = previous_version(&app.spec.version, &app.status.current_version);

        // every rollout is the root of its own trace
        let tracer = self.ctx.tracer.tracer();
        let mut span = tracer
            .span_builder(format!("{}-{}", app.metadata.name, app.spec.version))
            .with_kind(SpanKind::Producer)
            .with_attributes(vec![
                KeyValue::new(APP_NAME, app.metadata.name.clone()),
                KeyValue::new(APP_VERSION, app.spec.version.clone()),
                KeyValue::new(APP_NAMESPACE, app.metadata.namespace.clone()),
                KeyValue::new(APP_PREVIOUS_VERSION, previous_version.clone()),
            ])
            .start_with_context(tracer, &Context::new());
        span.set_status(Status::Ok);
        let root_cx = Context::new().with_span(span);
        let trace_id = self.ctx.tracer.inject(&root_cx);
        root_cx.span().end();

        let mut metadata = ObjectMeta::new(&app.metadata.namespace, app.app_version_name());
        metadata.labels = app.metadata.labels.clone();

        KeptnAppVersion {
            metadata,
            spec: KeptnAppVersionSpec {
                app: app.spec.clone(),
                app_name: app.metadata.name.clone(),
                previous_version,
                revision: app.metadata.generation,
                trace_id,
                span_links: inbound_carrier(&app.metadata).into_iter().collect(),
            },
            status: Default::default(),
        }
    }

    /// Deprecates every unfinished version left over from earlier generations.
    async fn deprecate_superseded(&self, app: &KeptnApp) -> Result<(), EngineError> {
        let versions = self
            .ctx
            .store
            .list_as::<KeptnAppVersion>(&app.metadata.namespace)
            .await?;
        for mut version in versions.into_iter().filter(|version| {
            version.spec.app_name == app.metadata.name
                && version.spec.revision < app.metadata.generation
                && !version.status.status.is_completed()
        }) {
            version.cancel_remaining_phases(&PHASE_DEPRECATED);
            version.complete();
            self.ctx.store.update_status_as(&version).await?;

            self.ctx.spans.unbind_span(&version, "");
            for phase in APP_PIPELINE.iter() {
                self.ctx.spans.unbind_span(&version, phase.short_name);
            }

            info!(
                app_version = %version.metadata.name,
                revision = version.spec.revision,
                generation = app.metadata.generation,
                "Deprecated superseded app version"
            );
            self.ctx.events.emit(
                &DEPRECATE_APP_VERSION,
                EventType::Normal,
                &ObjectRef::of(&version),
                EventReason::AppVersionDeprecated,
                &format!("deprecated by generation {}", app.metadata.generation),
                &version.spec.app.version,
            );
        }
        Ok(())
    }
}
