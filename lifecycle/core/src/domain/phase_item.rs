// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Phase Item Capabilities
//!
//! Uniform view over the two version record kinds the pipeline drives:
//! `KeptnAppVersion` and `KeptnWorkloadVersion`. The phase state machine and
//! the run handlers only ever see a [`PhaseItemWrapper`].
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Closed sum type over versioned entities with one shared trait

use crate::domain::errors::EngineError;
use crate::domain::object::{LifecycleObject, ObjectKind, ObjectRef};
use crate::domain::span::{
    SpanItem, APP_NAME, APP_NAMESPACE, APP_PREVIOUS_VERSION, APP_VERSION, WORKLOAD_NAME,
    WORKLOAD_NAMESPACE, WORKLOAD_PREVIOUS_VERSION, WORKLOAD_VERSION,
};
use chrono::{DateTime, Utc};
use keptn_lifecycle_api::app::KeptnAppVersion;
use keptn_lifecycle_api::evaluation::{KeptnEvaluation, KeptnEvaluationDefinition, KeptnEvaluationSpec};
use keptn_lifecycle_api::naming::{generate_evaluation_name, generate_task_name};
use keptn_lifecycle_api::task::{KeptnTask, KeptnTaskDefinition, KeptnTaskSpec, ObjectType, RunContext};
use keptn_lifecycle_api::workload::KeptnWorkloadVersion;
use keptn_lifecycle_api::{
    CheckType, ItemStatus, KeptnPhaseType, KeptnState, ObjectMeta, TraceCarrier,
};
use opentelemetry::KeyValue;
use std::collections::BTreeMap;

pub const LABEL_APP: &str = "keptn.sh/app";
pub const LABEL_WORKLOAD: &str = "keptn.sh/workload";
pub const LABEL_VERSION: &str = "keptn.sh/version";

const TRACEPARENT: &str = "traceparent";

/// Capabilities shared by every version record.
pub trait PhaseItem: SpanItem {
    fn kind(&self) -> ObjectKind;

    fn metadata(&self) -> &ObjectMeta;

    fn object_type(&self) -> ObjectType;

    fn state(&self) -> KeptnState;

    fn set_state(&mut self, state: KeptnState);

    fn current_phase(&self) -> &str;

    fn set_current_phase(&mut self, phase: &str);

    fn start_time(&self) -> Option<DateTime<Utc>>;

    fn end_time(&self) -> Option<DateTime<Utc>>;

    /// Stamps the start time unless already set.
    fn set_start_time(&mut self);

    /// Stamps the end time unless already set.
    fn set_end_time(&mut self);

    fn app_name(&self) -> &str;

    /// Name of the declared object this record versions.
    fn parent_name(&self) -> &str;

    fn version(&self) -> &str;

    fn previous_version(&self) -> &str;

    fn definitions(&self, check_type: CheckType) -> &[String];

    fn run_statuses(&self, check_type: CheckType) -> &[ItemStatus];

    fn set_run_statuses(&mut self, check_type: CheckType, statuses: Vec<ItemStatus>);

    fn phase_state(&self, phase: &KeptnPhaseType) -> Option<KeptnState>;

    fn set_phase_state(&mut self, phase: &KeptnPhaseType, state: KeptnState);

    fn trace_id(&self) -> &TraceCarrier;

    fn span_links(&self) -> &[TraceCarrier];

    fn set_phase_trace_id(&mut self, phase: &str, carrier: TraceCarrier);

    fn run_context(&self, check_type: CheckType) -> RunContext;

    /// Cascades after a failure of `phase`, or deprecates everything when
    /// `phase` is the deprecation marker.
    fn cancel_remaining_phases(&mut self, phase: &KeptnPhaseType);

    fn to_object(&self) -> LifecycleObject;

    fn namespace(&self) -> &str {
        &self.metadata().namespace
    }

    fn name(&self) -> &str {
        &self.metadata().name
    }

    fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.kind(), self.metadata())
    }

    fn is_end_time_set(&self) -> bool {
        self.end_time().is_some()
    }

    fn complete(&mut self) {
        self.set_end_time();
    }

    fn run_labels(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::from([
            (LABEL_APP.to_string(), self.app_name().to_string()),
            (LABEL_VERSION.to_string(), self.version().to_string()),
        ]);
        if self.object_type() == ObjectType::Workload {
            labels.insert(LABEL_WORKLOAD.to_string(), self.parent_name().to_string());
        }
        labels
    }

    fn generate_task(
        &self,
        definition: &KeptnTaskDefinition,
        check_type: CheckType,
        trace_context: TraceCarrier,
    ) -> KeptnTask {
        let mut metadata = ObjectMeta::new(
            self.namespace(),
            generate_task_name(check_type.stage(), &definition.metadata.name),
        );
        metadata.labels = self.run_labels();
        KeptnTask {
            metadata,
            spec: KeptnTaskSpec {
                task_definition: definition.metadata.name.clone(),
                context: self.run_context(check_type),
                parameters: definition.spec.parameters.clone(),
                check_type,
                retries: definition.spec.retries,
                timeout: definition.spec.timeout,
                trace_context,
            },
            status: Default::default(),
        }
    }

    fn generate_evaluation(
        &self,
        definition: &KeptnEvaluationDefinition,
        check_type: CheckType,
        trace_context: TraceCarrier,
    ) -> KeptnEvaluation {
        let mut metadata = ObjectMeta::new(
            self.namespace(),
            generate_evaluation_name(check_type.stage(), &definition.metadata.name),
        );
        metadata.labels = self.run_labels();
        KeptnEvaluation {
            metadata,
            spec: KeptnEvaluationSpec {
                evaluation_definition: definition.metadata.name.clone(),
                context: self.run_context(check_type),
                check_type,
                failure_conditions: definition.spec.failure_conditions.clone(),
                trace_context,
            },
            status: Default::default(),
        }
    }
}

fn entity_span_key(carrier: &TraceCarrier, name: &str, namespace: &str, version: &str, phase: &str) -> String {
    let traceparent = carrier.get(TRACEPARENT).map(String::as_str).unwrap_or_default();
    format!("{}.{}.{}.{}.{}", traceparent, name, namespace, version, phase)
}

impl SpanItem for KeptnAppVersion {
    fn span_key(&self, phase: &str) -> String {
        entity_span_key(
            &self.spec.trace_id,
            &self.spec.app_name,
            &self.metadata.namespace,
            &self.spec.app.version,
            phase,
        )
    }

    fn span_name(&self, phase: &str) -> String {
        if phase.is_empty() {
            self.metadata.name.clone()
        } else {
            phase.to_string()
        }
    }

    fn span_attributes(&self) -> Vec<KeyValue> {
        vec![
            KeyValue::new(APP_NAME, self.spec.app_name.clone()),
            KeyValue::new(APP_VERSION, self.spec.app.version.clone()),
            KeyValue::new(APP_NAMESPACE, self.metadata.namespace.clone()),
            KeyValue::new(APP_PREVIOUS_VERSION, self.spec.previous_version.clone()),
        ]
    }
}

impl PhaseItem for KeptnAppVersion {
    fn kind(&self) -> ObjectKind {
        ObjectKind::AppVersion
    }

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::App
    }

    fn state(&self) -> KeptnState {
        self.status.status
    }

    fn set_state(&mut self, state: KeptnState) {
        self.status.status = state;
    }

    fn current_phase(&self) -> &str {
        &self.status.current_phase
    }

    fn set_current_phase(&mut self, phase: &str) {
        self.status.current_phase = phase.to_string();
    }

    fn start_time(&self) -> Option<DateTime<Utc>> {
        self.status.start_time
    }

    fn end_time(&self) -> Option<DateTime<Utc>> {
        self.status.end_time
    }

    fn set_start_time(&mut self) {
        self.status.start_time.get_or_insert_with(Utc::now);
    }

    fn set_end_time(&mut self) {
        self.status.end_time.get_or_insert_with(Utc::now);
    }

    fn app_name(&self) -> &str {
        &self.spec.app_name
    }

    fn parent_name(&self) -> &str {
        &self.spec.app_name
    }

    fn version(&self) -> &str {
        &self.spec.app.version
    }

    fn previous_version(&self) -> &str {
        &self.spec.previous_version
    }

    fn definitions(&self, check_type: CheckType) -> &[String] {
        self.spec.app.checks.get(check_type)
    }

    fn run_statuses(&self, check_type: CheckType) -> &[ItemStatus] {
        self.status.runs.get(check_type)
    }

    fn set_run_statuses(&mut self, check_type: CheckType, statuses: Vec<ItemStatus>) {
        self.status.runs.set(check_type, statuses);
    }

    fn phase_state(&self, phase: &KeptnPhaseType) -> Option<KeptnState> {
        self.status.phase_state(phase)
    }

    fn set_phase_state(&mut self, phase: &KeptnPhaseType, state: KeptnState) {
        self.status.set_phase_state(phase, state);
    }

    fn trace_id(&self) -> &TraceCarrier {
        &self.spec.trace_id
    }

    fn span_links(&self) -> &[TraceCarrier] {
        &self.spec.span_links
    }

    fn set_phase_trace_id(&mut self, phase: &str, carrier: TraceCarrier) {
        self.status.phase_trace_ids.insert(phase.to_string(), carrier);
    }

    fn run_context(&self, check_type: CheckType) -> RunContext {
        RunContext {
            app_name: self.spec.app_name.clone(),
            app_version: self.spec.app.version.clone(),
            workload_name: String::new(),
            workload_version: String::new(),
            object_type: ObjectType::App,
            task_type: check_type,
        }
    }

    fn cancel_remaining_phases(&mut self, phase: &KeptnPhaseType) {
        KeptnAppVersion::cancel_remaining_phases(self, phase);
    }

    fn to_object(&self) -> LifecycleObject {
        LifecycleObject::AppVersion(self.clone())
    }
}

impl SpanItem for KeptnWorkloadVersion {
    fn span_key(&self, phase: &str) -> String {
        entity_span_key(
            &self.spec.trace_id,
            &self.spec.workload_name,
            &self.metadata.namespace,
            &self.spec.workload.version,
            phase,
        )
    }

    fn span_name(&self, phase: &str) -> String {
        if phase.is_empty() {
            self.metadata.name.clone()
        } else {
            phase.to_string()
        }
    }

    fn span_attributes(&self) -> Vec<KeyValue> {
        vec![
            KeyValue::new(APP_NAME, self.spec.workload.app_name.clone()),
            KeyValue::new(WORKLOAD_NAME, self.spec.workload_name.clone()),
            KeyValue::new(WORKLOAD_VERSION, self.spec.workload.version.clone()),
            KeyValue::new(WORKLOAD_NAMESPACE, self.metadata.namespace.clone()),
            KeyValue::new(WORKLOAD_PREVIOUS_VERSION, self.spec.previous_version.clone()),
        ]
    }
}

impl PhaseItem for KeptnWorkloadVersion {
    fn kind(&self) -> ObjectKind {
        ObjectKind::WorkloadVersion
    }

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::Workload
    }

    fn state(&self) -> KeptnState {
        self.status.status
    }

    fn set_state(&mut self, state: KeptnState) {
        self.status.status = state;
    }

    fn current_phase(&self) -> &str {
        &self.status.current_phase
    }

    fn set_current_phase(&mut self, phase: &str) {
        self.status.current_phase = phase.to_string();
    }

    fn start_time(&self) -> Option<DateTime<Utc>> {
        self.status.start_time
    }

    fn end_time(&self) -> Option<DateTime<Utc>> {
        self.status.end_time
    }

    fn set_start_time(&mut self) {
        self.status.start_time.get_or_insert_with(Utc::now);
    }

    fn set_end_time(&mut self) {
        self.status.end_time.get_or_insert_with(Utc::now);
    }

    fn app_name(&self) -> &str {
        &self.spec.workload.app_name
    }

    fn parent_name(&self) -> &str {
        &self.spec.workload_name
    }

    fn version(&self) -> &str {
        &self.spec.workload.version
    }

    fn previous_version(&self) -> &str {
        &self.spec.previous_version
    }

    fn definitions(&self, check_type: CheckType) -> &[String] {
        self.spec.workload.checks.get(check_type)
    }

    fn run_statuses(&self, check_type: CheckType) -> &[ItemStatus] {
        self.status.runs.get(check_type)
    }

    fn set_run_statuses(&mut self, check_type: CheckType, statuses: Vec<ItemStatus>) {
        self.status.runs.set(check_type, statuses);
    }

    fn phase_state(&self, phase: &KeptnPhaseType) -> Option<KeptnState> {
        self.status.phase_state(phase)
    }

    fn set_phase_state(&mut self, phase: &KeptnPhaseType, state: KeptnState) {
        self.status.set_phase_state(phase, state);
    }

    fn trace_id(&self) -> &TraceCarrier {
        &self.spec.trace_id
    }

    fn span_links(&self) -> &[TraceCarrier] {
        &[]
    }

    fn set_phase_trace_id(&mut self, phase: &str, carrier: TraceCarrier) {
        self.status.phase_trace_ids.insert(phase.to_string(), carrier);
    }

    fn run_context(&self, check_type: CheckType) -> RunContext {
        RunContext {
            app_name: self.spec.workload.app_name.clone(),
            app_version: String::new(),
            workload_name: self.spec.workload_name.clone(),
            workload_version: self.spec.workload.version.clone(),
            object_type: ObjectType::Workload,
            task_type: check_type,
        }
    }

    fn cancel_remaining_phases(&mut self, phase: &KeptnPhaseType) {
        KeptnWorkloadVersion::cancel_remaining_phases(self, phase);
    }

    fn to_object(&self) -> LifecycleObject {
        LifecycleObject::WorkloadVersion(self.clone())
    }
}

/// A version record the phase pipeline can drive.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseItemWrapper {
    AppVersion(KeptnAppVersion),
    WorkloadVersion(KeptnWorkloadVersion),
}

macro_rules! dispatch {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            PhaseItemWrapper::AppVersion($inner) => $body,
            PhaseItemWrapper::WorkloadVersion($inner) => $body,
        }
    };
}

impl PhaseItemWrapper {
    pub fn as_app_version(&self) -> Option<&KeptnAppVersion> {
        match self {
            PhaseItemWrapper::AppVersion(version) => Some(version),
            PhaseItemWrapper::WorkloadVersion(_) => None,
        }
    }

    pub fn as_app_version_mut(&mut self) -> Option<&mut KeptnAppVersion> {
        match self {
            PhaseItemWrapper::AppVersion(version) => Some(version),
            PhaseItemWrapper::WorkloadVersion(_) => None,
        }
    }

    pub fn as_workload_version(&self) -> Option<&KeptnWorkloadVersion> {
        match self {
            PhaseItemWrapper::WorkloadVersion(version) => Some(version),
            PhaseItemWrapper::AppVersion(_) => None,
        }
    }

    pub fn as_workload_version_mut(&mut self) -> Option<&mut KeptnWorkloadVersion> {
        match self {
            PhaseItemWrapper::WorkloadVersion(version) => Some(version),
            PhaseItemWrapper::AppVersion(_) => None,
        }
    }
}

impl From<KeptnAppVersion> for PhaseItemWrapper {
    fn from(version: KeptnAppVersion) -> Self {
        PhaseItemWrapper::AppVersion(version)
    }
}

impl From<KeptnWorkloadVersion> for PhaseItemWrapper {
    fn from(version: KeptnWorkloadVersion) -> Self {
        PhaseItemWrapper::WorkloadVersion(version)
    }
}

impl TryFrom<LifecycleObject> for PhaseItemWrapper {
    type Error = EngineError;

    fn try_from(object: LifecycleObject) -> Result<Self, Self::Error> {
        match object {
            LifecycleObject::AppVersion(version) => Ok(PhaseItemWrapper::AppVersion(version)),
            LifecycleObject::WorkloadVersion(version) => Ok(PhaseItemWrapper::WorkloadVersion(version)),
            other => Err(EngineError::CannotWrapToPhaseItem(other.kind())),
        }
    }
}

impl SpanItem for PhaseItemWrapper {
    fn span_key(&self, phase: &str) -> String {
        dispatch!(self, v => v.span_key(phase))
    }

    fn span_name(&self, phase: &str) -> String {
        dispatch!(self, v => v.span_name(phase))
    }

    fn span_attributes(&self) -> Vec<KeyValue> {
        dispatch!(self, v => v.span_attributes())
    }
}

impl PhaseItem for PhaseItemWrapper {
    fn kind(&self) -> ObjectKind {
        dispatch!(self, v => v.kind())
    }

    fn metadata(&self) -> &ObjectMeta {
        dispatch!(self, v => &v.metadata)
    }

    fn object_type(&self) -> ObjectType {
        dispatch!(self, v => v.object_type())
    }

    fn state(&self) -> KeptnState {
        dispatch!(self, v => v.state())
    }

    fn set_state(&mut self, state: KeptnState) {
        dispatch!(self, v => v.set_state(state))
    }

    fn current_phase(&self) -> &str {
        dispatch!(self, v => v.current_phase())
    }

    fn set_current_phase(&mut self, phase: &str) {
        dispatch!(self, v => v.set_current_phase(phase))
    }

    fn start_time(&self) -> Option<DateTime<Utc>> {
        dispatch!(self, v => v.start_time())
    }

    fn end_time(&self) -> Option<DateTime<Utc>> {
        dispatch!(self, v => v.end_time())
    }

    fn set_start_time(&mut self) {
        dispatch!(self, v => PhaseItem::set_start_time(v))
    }

    fn set_end_time(&mut self) {
        dispatch!(self, v => PhaseItem::set_end_time(v))
    }

    fn app_name(&self) -> &str {
        dispatch!(self, v => v.app_name())
    }

    fn parent_name(&self) -> &str {
        dispatch!(self, v => v.parent_name())
    }

    fn version(&self) -> &str {
        dispatch!(self, v => v.version())
    }

    fn previous_version(&self) -> &str {
        dispatch!(self, v => v.previous_version())
    }

    fn definitions(&self, check_type: CheckType) -> &[String] {
        dispatch!(self, v => v.definitions(check_type))
    }

    fn run_statuses(&self, check_type: CheckType) -> &[ItemStatus] {
        dispatch!(self, v => v.run_statuses(check_type))
    }

    fn set_run_statuses(&mut self, check_type: CheckType, statuses: Vec<ItemStatus>) {
        dispatch!(self, v => v.set_run_statuses(check_type, statuses))
    }

    fn phase_state(&self, phase: &KeptnPhaseType) -> Option<KeptnState> {
        dispatch!(self, v => PhaseItem::phase_state(v, phase))
    }

    fn set_phase_state(&mut self, phase: &KeptnPhaseType, state: KeptnState) {
        dispatch!(self, v => PhaseItem::set_phase_state(v, phase, state))
    }

    fn trace_id(&self) -> &TraceCarrier {
        dispatch!(self, v => v.trace_id())
    }

    fn span_links(&self) -> &[TraceCarrier] {
        dispatch!(self, v => v.span_links())
    }

    fn set_phase_trace_id(&mut self, phase: &str, carrier: TraceCarrier) {
        dispatch!(self, v => v.set_phase_trace_id(phase, carrier))
    }

    fn run_context(&self, check_type: CheckType) -> RunContext {
        dispatch!(self, v => v.run_context(check_type))
    }

    fn cancel_remaining_phases(&mut self, phase: &KeptnPhaseType) {
        dispatch!(self, v => v.cancel_remaining_phases(phase))
    }

    fn to_object(&self) -> LifecycleObject {
        dispatch!(self, v => v.to_object())
    }
}
