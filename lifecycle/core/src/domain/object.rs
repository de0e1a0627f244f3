// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Stored Objects
//!
//! Closed set of record kinds the engine reads and writes through the
//! declarative store, plus the typed conversion used by `StoreExt`.

use keptn_lifecycle_api::app::{KeptnApp, KeptnAppVersion};
use keptn_lifecycle_api::evaluation::{KeptnEvaluation, KeptnEvaluationDefinition};
use keptn_lifecycle_api::task::{KeptnTask, KeptnTaskDefinition};
use keptn_lifecycle_api::workload::{KeptnWorkload, KeptnWorkloadVersion};
use keptn_lifecycle_api::{ObjectKey, ObjectMeta};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    App,
    AppVersion,
    Workload,
    WorkloadVersion,
    Task,
    TaskDefinition,
    Evaluation,
    EvaluationDefinition,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::App => "KeptnApp",
            ObjectKind::AppVersion => "KeptnAppVersion",
            ObjectKind::Workload => "KeptnWorkload",
            ObjectKind::WorkloadVersion => "KeptnWorkloadVersion",
            ObjectKind::Task => "KeptnTask",
            ObjectKind::TaskDefinition => "KeptnTaskDefinition",
            ObjectKind::Evaluation => "KeptnEvaluation",
            ObjectKind::EvaluationDefinition => "KeptnEvaluationDefinition",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any record held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum LifecycleObject {
    App(KeptnApp),
    AppVersion(KeptnAppVersion),
    Workload(KeptnWorkload),
    WorkloadVersion(KeptnWorkloadVersion),
    Task(KeptnTask),
    TaskDefinition(KeptnTaskDefinition),
    Evaluation(KeptnEvaluation),
    EvaluationDefinition(KeptnEvaluationDefinition),
}

impl LifecycleObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            LifecycleObject::App(_) => ObjectKind::App,
            LifecycleObject::AppVersion(_) => ObjectKind::AppVersion,
            LifecycleObject::Workload(_) => ObjectKind::Workload,
            LifecycleObject::WorkloadVersion(_) => ObjectKind::WorkloadVersion,
            LifecycleObject::Task(_) => ObjectKind::Task,
            LifecycleObject::TaskDefinition(_) => ObjectKind::TaskDefinition,
            LifecycleObject::Evaluation(_) => ObjectKind::Evaluation,
            LifecycleObject::EvaluationDefinition(_) => ObjectKind::EvaluationDefinition,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            LifecycleObject::App(o) => &o.metadata,
            LifecycleObject::AppVersion(o) => &o.metadata,
            LifecycleObject::Workload(o) => &o.metadata,
            LifecycleObject::WorkloadVersion(o) => &o.metadata,
            LifecycleObject::Task(o) => &o.metadata,
            LifecycleObject::TaskDefinition(o) => &o.metadata,
            LifecycleObject::Evaluation(o) => &o.metadata,
            LifecycleObject::EvaluationDefinition(o) => &o.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            LifecycleObject::App(o) => &mut o.metadata,
            LifecycleObject::AppVersion(o) => &mut o.metadata,
            LifecycleObject::Workload(o) => &mut o.metadata,
            LifecycleObject::WorkloadVersion(o) => &mut o.metadata,
            LifecycleObject::Task(o) => &mut o.metadata,
            LifecycleObject::TaskDefinition(o) => &mut o.metadata,
            LifecycleObject::Evaluation(o) => &mut o.metadata,
            LifecycleObject::EvaluationDefinition(o) => &mut o.metadata,
        }
    }

    pub fn key(&self) -> ObjectKey {
        self.metadata().key()
    }

    /// Copies the status of `from` onto `self`.
    ///
    /// Returns false when the kinds differ or the kind has no status.
    pub fn replace_status(&mut self, from: &LifecycleObject) -> bool {
        match (self, from) {
            (LifecycleObject::App(to), LifecycleObject::App(from)) => to.status = from.status.clone(),
            (LifecycleObject::AppVersion(to), LifecycleObject::AppVersion(from)) => {
                to.status = from.status.clone()
            }
            (LifecycleObject::Workload(to), LifecycleObject::Workload(from)) => {
                to.status = from.status.clone()
            }
            (LifecycleObject::WorkloadVersion(to), LifecycleObject::WorkloadVersion(from)) => {
                to.status = from.status.clone()
            }
            (LifecycleObject::Task(to), LifecycleObject::Task(from)) => to.status = from.status.clone(),
            (LifecycleObject::Evaluation(to), LifecycleObject::Evaluation(from)) => {
                to.status = from.status.clone()
            }
            _ => return false,
        }
        true
    }
}

/// Typed view of one [`LifecycleObject`] variant.
pub trait Resource: Clone + Send + Sync + Sized + 'static {
    const KIND: ObjectKind;

    fn into_object(self) -> LifecycleObject;

    fn from_object(object: LifecycleObject) -> Option<Self>;

    fn metadata(&self) -> &ObjectMeta;
}

macro_rules! impl_resource {
    ($ty:ty, $variant:ident) => {
        impl Resource for $ty {
            const KIND: ObjectKind = ObjectKind::$variant;

            fn into_object(self) -> LifecycleObject {
                LifecycleObject::$variant(self)
            }

            fn from_object(object: LifecycleObject) -> Option<Self> {
                match object {
                    LifecycleObject::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn metadata(&self) -> &ObjectMeta {
                &self.metadata
            }
        }
    };
}

impl_resource!(KeptnApp, App);
impl_resource!(KeptnAppVersion, AppVersion);
impl_resource!(KeptnWorkload, Workload);
impl_resource!(KeptnWorkloadVersion, WorkloadVersion);
impl_resource!(KeptnTask, Task);
impl_resource!(KeptnTaskDefinition, TaskDefinition);
impl_resource!(KeptnEvaluation, Evaluation);
impl_resource!(KeptnEvaluationDefinition, EvaluationDefinition);

/// Object an event is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub namespace: String,
    pub name: String,
}

impl ObjectRef {
    pub fn new(kind: ObjectKind, meta: &ObjectMeta) -> Self {
        Self {
            kind,
            namespace: meta.namespace.clone(),
            name: meta.name.clone(),
        }
    }

    pub fn of<T: Resource>(resource: &T) -> Self {
        Self::new(T::KIND, resource.metadata())
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}
