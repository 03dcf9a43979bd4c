// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes side of a `Backend` reconcile: fetching the resource, managing its
//! finalizer, patching its status and publishing events.

use crate::constants::BACKEND_FINALIZER;
use crate::crd::{Backend, BackendStatus};
use crate::reconcilers::finalizers::{ensure_finalizer, remove_finalizer};
use crate::reconcilers::status::{create_event, EventType};
use anyhow::Result;
use async_trait::async_trait;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use tracing::debug;

/// Operations the reconciler performs on `Backend` resources.
#[async_trait]
pub trait BackendStore: Send + Sync {
    /// Fetch a `Backend`. `None` if it does not exist.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Backend>>;

    async fn add_finalizer(&self, backend: &Backend) -> Result<()>;

    async fn remove_finalizer(&self, backend: &Backend) -> Result<()>;

    /// Replace the status subresource.
    async fn patch_status(&self, backend: &Backend, status: &BackendStatus) -> Result<()>;

    /// Publish an event. Never fails.
    async fn publish_event(
        &self,
        backend: &Backend,
        event_type: EventType,
        reason: &str,
        message: &str,
    );
}

/// [`BackendStore`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeBackendStore {
    client: Client,
}

impl KubeBackendStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BackendStore for KubeBackendStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Backend>> {
        let api: Api<Backend> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn add_finalizer(&self, backend: &Backend) -> Result<()> {
        ensure_finalizer(&self.client, backend, BACKEND_FINALIZER).await
    }

    async fn remove_finalizer(&self, backend: &Backend) -> Result<()> {
        remove_finalizer(&self.client, backend, BACKEND_FINALIZER).await
    }

    async fn patch_status(&self, backend: &Backend, status: &BackendStatus) -> Result<()> {
        let namespace = backend.namespace().unwrap_or_default();
        let name = backend.name_any();
        let api: Api<Backend> = Api::namespaced(self.client.clone(), &namespace);

        let patch = json!({ "status": status });
        api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        debug!(namespace = %namespace, name = %name, "Patched Backend status");
        Ok(())
    }

    async fn publish_event(
        &self,
        backend: &Backend,
        event_type: EventType,
        reason: &str,
        message: &str,
    ) {
        create_event(&self.client, backend, event_type, reason, message).await;
    }
}
