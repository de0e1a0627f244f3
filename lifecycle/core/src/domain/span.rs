// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Trace identity of objects that own spans.

use keptn_lifecycle_api::evaluation::KeptnEvaluation;
use keptn_lifecycle_api::task::{KeptnTask, RunContext};
use opentelemetry::trace::Link;
use opentelemetry::{Context, KeyValue};

pub const APP_NAME: &str = "keptn.deployment.app.name";
pub const APP_VERSION: &str = "keptn.deployment.app.version";
pub const APP_NAMESPACE: &str = "keptn.deployment.app.namespace";
pub const APP_PREVIOUS_VERSION: &str = "keptn.deployment.app.previousversion";
pub const WORKLOAD_NAME: &str = "keptn.deployment.workload.name";
pub const WORKLOAD_VERSION: &str = "keptn.deployment.workload.version";
pub const WORKLOAD_NAMESPACE: &str = "keptn.deployment.workload.namespace";
pub const WORKLOAD_PREVIOUS_VERSION: &str = "keptn.deployment.workload.previousversion";
pub const TASK_NAME: &str = "keptn.deployment.task.name";
pub const TASK_TYPE: &str = "keptn.deployment.task.type";
pub const EVALUATION_NAME: &str = "keptn.deployment.evaluation.name";
pub const EVALUATION_TYPE: &str = "keptn.deployment.evaluation.type";

/// Anything the span cache can hold spans for.
pub trait SpanItem: Send + Sync {
    /// Deterministic cache key for the span of `phase`.
    fn span_key(&self, phase: &str) -> String;

    fn span_name(&self, phase: &str) -> String;

    fn span_attributes(&self) -> Vec<KeyValue>;
}

/// Keeps one open span per (item, phase) across reconcile calls.
pub trait SpanHandler: Send + Sync {
    /// Returns the context holding the bound span for `phase`, starting and
    /// binding a child of `parent` if none is bound yet. `links` only apply
    /// to a newly started span.
    fn get_span(&self, parent: &Context, item: &dyn SpanItem, phase: &str, links: Vec<Link>) -> Context;

    /// Forgets the span bound for `phase`. The caller ends it first.
    fn unbind_span(&self, item: &dyn SpanItem, phase: &str);
}

fn context_attributes(context: &RunContext) -> Vec<KeyValue> {
    let mut attributes = vec![
        KeyValue::new(APP_NAME, context.app_name.clone()),
        KeyValue::new(APP_VERSION, context.app_version.clone()),
    ];
    if !context.workload_name.is_empty() {
        attributes.push(KeyValue::new(WORKLOAD_NAME, context.workload_name.clone()));
        attributes.push(KeyValue::new(WORKLOAD_VERSION, context.workload_version.clone()));
    }
    attributes
}

impl SpanItem for KeptnTask {
    fn span_key(&self, phase: &str) -> String {
        format!("{}.{}.{}", self.metadata.namespace, self.metadata.name, phase)
    }

    fn span_name(&self, _phase: &str) -> String {
        self.metadata.name.clone()
    }

    fn span_attributes(&self) -> Vec<KeyValue> {
        let mut attributes = context_attributes(&self.spec.context);
        attributes.push(KeyValue::new(TASK_NAME, self.spec.task_definition.clone()));
        attributes.push(KeyValue::new(TASK_TYPE, self.spec.check_type.as_str()));
        attributes
    }
}

impl SpanItem for KeptnEvaluation {
    fn span_key(&self, phase: &str) -> String {
        format!("{}.{}.{}", self.metadata.namespace, self.metadata.name, phase)
    }

    fn span_name(&self, _phase: &str) -> String {
        self.metadata.name.clone()
    }

    fn span_attributes(&self) -> Vec<KeyValue> {
        let mut attributes = context_attributes(&self.spec.context);
        attributes.push(KeyValue::new(EVALUATION_NAME, self.spec.evaluation_definition.clone()));
        attributes.push(KeyValue::new(EVALUATION_TYPE, self.spec.check_type.as_str()));
        attributes
    }
}
