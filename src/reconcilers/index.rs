// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reverse index from Services to the `Backend` resources that reference them.
//!
//! Service and `EndpointSlice` events carry no pointer back to the Backends that
//! resolve servers from them. The reconciler records every Backend's referenced
//! Services here, and the watch mappers use it to turn a membership change into
//! reconcile requests for exactly the affected Backends.

use crate::constants::SERVICE_NAME_LABEL;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::discovery::v1::EndpointSlice;
use kube::ResourceExt;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Namespace and name of a namespaced object.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    #[must_use]
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Debug, Default)]
struct Inner {
    by_service: BTreeMap<ObjectKey, BTreeSet<ObjectKey>>,
    by_backend: BTreeMap<ObjectKey, BTreeSet<ObjectKey>>,
}

/// Thread-safe Service to Backend index.
#[derive(Debug, Default)]
pub struct ServiceIndex {
    inner: RwLock<Inner>,
}

impl ServiceIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock still holds a consistent map; every write is a full replace.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Replace the set of Services referenced by `backend`.
    pub fn update(&self, backend: &ObjectKey, services: BTreeSet<ObjectKey>) {
        let mut inner = self.write();
        Self::unlink(&mut inner, backend);
        if services.is_empty() {
            return;
        }
        for service in &services {
            inner
                .by_service
                .entry(service.clone())
                .or_default()
                .insert(backend.clone());
        }
        inner.by_backend.insert(backend.clone(), services);
    }

    /// Forget `backend` entirely.
    pub fn remove(&self, backend: &ObjectKey) {
        let mut inner = self.write();
        Self::unlink(&mut inner, backend);
    }

    fn unlink(inner: &mut Inner, backend: &ObjectKey) {
        let Some(previous) = inner.by_backend.remove(backend) else {
            return;
        };
        for service in previous {
            if let Some(backends) = inner.by_service.get_mut(&service) {
                backends.remove(backend);
                if backends.is_empty() {
                    inner.by_service.remove(&service);
                }
            }
        }
    }

    /// Backends referencing the Service `namespace/name`.
    #[must_use]
    pub fn backends_for(&self, service: &ObjectKey) -> Vec<ObjectKey> {
        self.read()
            .by_service
            .get(service)
            .map(|backends| backends.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Backends affected by a change to `service`.
    #[must_use]
    pub fn backends_for_service(&self, service: &Service) -> Vec<ObjectKey> {
        let key = ObjectKey::new(&service.namespace().unwrap_or_default(), &service.name_any());
        self.backends_for(&key)
    }

    /// Backends affected by a change to `slice`, found through its owning Service label.
    #[must_use]
    pub fn backends_for_endpoint_slice(&self, slice: &EndpointSlice) -> Vec<ObjectKey> {
        let Some(service_name) = slice.labels().get(SERVICE_NAME_LABEL) else {
            return Vec::new();
        };
        let key = ObjectKey::new(&slice.namespace().unwrap_or_default(), service_name);
        self.backends_for(&key)
    }

    /// Number of Backends currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().by_backend.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
