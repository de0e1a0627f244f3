// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Declarative Store Contract
//!
//! The engine keeps no durable state of its own. Every record lives in an
//! external store reached through [`ObjectStore`], implemented in
//! `crate::infrastructure::repositories`.
//!
//! | Operation | Semantics |
//! |-----------|-----------|
//! | `get` | fetch by (kind, namespace, name); `NotFound` is distinguished |
//! | `list` | every object of a kind in a namespace |
//! | `create` | insert; `AlreadyExists` on a name clash |
//! | `update_status` | replace the status of an existing object |
//!
//! Each version record's status is written only by its own reconcile path,
//! so the store needs no locking beyond its own consistency.

use crate::domain::object::{LifecycleObject, ObjectKind, Resource};
use async_trait::async_trait;
use keptn_lifecycle_api::ObjectKey;
use thiserror::Error;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, kind: ObjectKind, key: &ObjectKey) -> Result<LifecycleObject, StoreError>;

    async fn list(&self, kind: ObjectKind, namespace: &str) -> Result<Vec<LifecycleObject>, StoreError>;

    /// Insert a new object and return it as stored.
    async fn create(&self, object: LifecycleObject) -> Result<LifecycleObject, StoreError>;

    /// Replace the status of an existing object. Never creates.
    async fn update_status(&self, object: &LifecycleObject) -> Result<(), StoreError>;
}

/// Typed helpers over any [`ObjectStore`].
#[async_trait]
pub trait StoreExt: ObjectStore {
    async fn get_as<T: Resource>(&self, key: &ObjectKey) -> Result<T, StoreError> {
        let object = self.get(T::KIND, key).await?;
        T::from_object(object).ok_or_else(|| StoreError::KindMismatch {
            expected: T::KIND,
            key: key.clone(),
        })
    }

    async fn list_as<T: Resource>(&self, namespace: &str) -> Result<Vec<T>, StoreError> {
        let objects = self.list(T::KIND, namespace).await?;
        Ok(objects.into_iter().filter_map(T::from_object).collect())
    }

    async fn create_as<T: Resource>(&self, resource: T) -> Result<T, StoreError> {
        let key = resource.metadata().key();
        let stored = self.create(resource.into_object()).await?;
        T::from_object(stored).ok_or(StoreError::KindMismatch { expected: T::KIND, key })
    }

    async fn update_status_as<T: Resource>(&self, resource: &T) -> Result<(), StoreError> {
        self.update_status(&resource.clone().into_object()).await
    }
}

impl<S: ObjectStore + ?Sized> StoreExt for S {}

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {key} not found")]
    NotFound { kind: ObjectKind, key: ObjectKey },

    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: ObjectKind, key: ObjectKey },

    #[error("object {key} is not a {expected}")]
    KindMismatch { expected: ObjectKind, key: ObjectKey },

    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }
}
