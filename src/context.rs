// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the `Backend` controller.
//!
//! Every reconcile receives an `Arc<Context>` that contains:
//! - The `Backend` store (fetch, finalizer, status, events)
//! - Membership lookup for Services, `EndpointSlices` and Pods
//! - The Data Plane API client
//! - The Service → Backend re-trigger index
//! - The metrics sink
//!
//! Kubernetes access sits behind traits so the reconciler can be driven by
//! in-memory fakes.

use crate::haproxy::HaproxyClient;
use crate::metrics::MetricsSink;
use crate::reconcilers::backend::resolver::{KubeMembershipLookup, MembershipLookup};
use crate::reconcilers::backend::store::{BackendStore, KubeBackendStore};
use crate::reconcilers::index::ServiceIndex;
use kube::Client;
use std::sync::Arc;

/// Shared context passed to every `Backend` reconcile.
#[derive(Clone)]
pub struct Context {
    /// `Backend` resources
    pub store: Arc<dyn BackendStore>,

    /// Services, `EndpointSlices` and Pods
    pub lookup: Arc<dyn MembershipLookup>,

    /// Data Plane API client
    pub haproxy: HaproxyClient,

    /// Which Backends reference which Services
    pub index: Arc<ServiceIndex>,

    /// Metrics for observability
    pub metrics: Arc<dyn MetricsSink>,
}

impl Context {
    /// Context backed by the Kubernetes API.
    #[must_use]
    pub fn new(client: Client, haproxy: HaproxyClient, metrics: Arc<dyn MetricsSink>) -> Self {
        Self::with_collaborators(
            Arc::new(KubeBackendStore::new(client.clone())),
            Arc::new(KubeMembershipLookup::new(client)),
            haproxy,
            metrics,
        )
    }

    /// Context with explicit collaborators and an empty index.
    #[must_use]
    pub fn with_collaborators(
        store: Arc<dyn BackendStore>,
        lookup: Arc<dyn MembershipLookup>,
        haproxy: HaproxyClient,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            store,
            lookup,
            haproxy,
            index: Arc::new(ServiceIndex::new()),
            metrics,
        }
    }
}
