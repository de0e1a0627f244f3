// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Store Implementations
//!
//! Infrastructure implementations of the [`ObjectStore`] contract.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Hold lifecycle records between reconcile calls
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! ## In-Memory Store
//!
//! - **InMemoryObjectStore** - Thread-safe HashMap-backed storage, used for
//!   embedding the engine and in tests. A platform-backed store implements
//!   the same trait.

use crate::domain::object::{LifecycleObject, ObjectKind, Resource};
use crate::domain::repository::{ObjectStore, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use keptn_lifecycle_api::ObjectKey;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

type ObjectMap = HashMap<(ObjectKind, ObjectKey), LifecycleObject>;

#[derive(Clone, Default)]
pub struct InMemoryObjectStore {
    objects: Arc<RwLock<ObjectMap>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an object wholesale, spec included.
    ///
    /// Stands in for the user or an external runner editing a record.
    pub fn insert(&self, object: LifecycleObject) {
        let key = (object.kind(), object.key());
        self.objects.write().insert(key, object);
    }

    pub fn insert_as<T: Resource>(&self, resource: T) {
        self.insert(resource.into_object());
    }

    /// Typed read without going through the async contract.
    pub fn snapshot<T: Resource>(&self, namespace: &str, name: &str) -> Option<T> {
        self.objects
            .read()
            .get(&(T::KIND, ObjectKey::new(namespace, name)))
            .cloned()
            .and_then(T::from_object)
    }

    pub fn count(&self, kind: ObjectKind) -> usize {
        self.objects.read().keys().filter(|(k, _)| *k == kind).count()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, kind: ObjectKind, key: &ObjectKey) -> Result<LifecycleObject, StoreError> {
        self.objects
            .read()
            .get(&(kind, key.clone()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound { kind, key: key.clone() })
    }

    async fn list(&self, kind: ObjectKind, namespace: &str) -> Result<Vec<LifecycleObject>, StoreError> {
        let objects = self.objects.read();
        let mut found: Vec<LifecycleObject> = objects
            .iter()
            .filter(|((k, key), _)| *k == kind && key.namespace == namespace)
            .map(|(_, object)| object.clone())
            .collect();
        found.sort_by(|a, b| a.metadata().name.cmp(&b.metadata().name));
        Ok(found)
    }

    async fn create(&self, mut object: LifecycleObject) -> Result<LifecycleObject, StoreError> {
        let kind = object.kind();
        let key = object.key();
        let mut objects = self.objects.write();
        if objects.contains_key(&(kind, key.clone())) {
            return Err(StoreError::AlreadyExists { kind, key });
        }
        object.metadata_mut().created_at.get_or_insert_with(Utc::now);
        objects.insert((kind, key), object.clone());
        Ok(object)
    }

    async fn update_status(&self, object: &LifecycleObject) -> Result<(), StoreError> {
        let kind = object.kind();
        let key = object.key();
        let mut objects = self.objects.write();
        let stored = objects
            .get_mut(&(kind, key.clone()))
            .ok_or_else(|| StoreError::NotFound { kind, key: key.clone() })?;
        if !stored.replace_status(object) {
            return Err(StoreError::Backend(format!("{} has no status to update", kind)));
        }
        Ok(())
    }
}
