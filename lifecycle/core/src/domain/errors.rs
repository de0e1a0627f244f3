// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Engine error taxonomy.

use crate::domain::object::ObjectKind;
use crate::domain::repository::StoreError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The object is not one of the version record kinds.
    #[error("{0} does not implement the phase item capabilities")]
    CannotWrapToPhaseItem(ObjectKind),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{kind} '{name}' not found in namespace '{namespace}' or '{fallback_namespace}'")]
    DefinitionNotFound {
        kind: ObjectKind,
        name: String,
        namespace: String,
        fallback_namespace: String,
    },

    #[error("no free name for a run of '{definition}' after {attempts} attempts")]
    NameCollision { definition: String, attempts: u32 },

    /// A phase function failed; the entity is untouched and the phase retried.
    #[error("phase {phase} could not be reconciled: {source}")]
    PhaseReconcile {
        phase: String,
        retry_after: Duration,
        #[source]
        source: Box<EngineError>,
    },

    #[error("deployment probe failed: {0}")]
    Probe(String),
}

impl EngineError {
    /// Delay after which the scheduler should retry, if the error is transient.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            EngineError::PhaseReconcile { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::Store(e) if e.is_not_found())
    }
}
