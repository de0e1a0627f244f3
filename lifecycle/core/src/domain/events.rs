// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Lifecycle Notifications
//!
//! Human-readable, reason-coded notifications about version records and their
//! runs. The engine emits them through [`EventSender`]; delivery is up to the
//! implementation (`crate::infrastructure::event_bus`).
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Notification vocabulary and sink contract

use crate::domain::object::ObjectRef;
use chrono::{DateTime, Utc};
use keptn_lifecycle_api::KeptnPhaseType;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Normal,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventReason {
    Started,
    StatusChanged,
    NotFinished,
    Succeeded,
    Failed,
    ReconcileError,
    NotFound,
    Created,
    AppVersionCreated,
    AppVersionDeprecated,
    WorkloadVersionCreated,
}

impl EventReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventReason::Started => "Started",
            EventReason::StatusChanged => "StatusChanged",
            EventReason::NotFinished => "NotFinished",
            EventReason::Succeeded => "Succeeded",
            EventReason::Failed => "Failed",
            EventReason::ReconcileError => "ReconcileError",
            EventReason::NotFound => "NotFound",
            EventReason::Created => "Created",
            EventReason::AppVersionCreated => "AppVersionCreated",
            EventReason::AppVersionDeprecated => "AppVersionDeprecated",
            EventReason::WorkloadVersionCreated => "WorkloadVersionCreated",
        }
    }
}

impl fmt::Display for EventReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One emitted notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub event_type: EventType,
    pub reason: EventReason,
    /// Short phase name followed by the reason, e.g. `AppPreDeployTasksStarted`.
    pub reason_code: String,
    pub phase: String,
    pub involved: ObjectRef,
    pub message: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn new(
        phase: &KeptnPhaseType,
        event_type: EventType,
        involved: &ObjectRef,
        reason: EventReason,
        message: &str,
        version: &str,
    ) -> Self {
        Self {
            event_type,
            reason,
            reason_code: format!("{}{}", phase.short_name, reason),
            phase: phase.short_name.to_string(),
            involved: involved.clone(),
            message: format!(
                "{}: {} / Namespace: {}, Name: {}, Version: {}",
                phase.long_name, message, involved.namespace, involved.name, version
            ),
            version: version.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Sink for lifecycle notifications. Emission never fails the caller.
pub trait EventSender: Send + Sync {
    fn send(&self, event: LifecycleEvent);

    fn emit(
        &self,
        phase: &KeptnPhaseType,
        event_type: EventType,
        involved: &ObjectRef,
        reason: EventReason,
        message: &str,
        version: &str,
    ) {
        self.send(LifecycleEvent::new(phase, event_type, involved, reason, message, version));
    }
}
