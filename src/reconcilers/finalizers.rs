// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer management for namespaced resources.
//!
//! The finalizer keeps a `Backend` from disappearing until its HAProxy backend has
//! been torn down. Both operations are idempotent and patch only the
//! `metadata.finalizers` list.
//!
//! # Example
//!
//! ```rust,no_run
//! use haproxy_operator::constants::BACKEND_FINALIZER;
//! use haproxy_operator::crd::Backend;
//! use haproxy_operator::reconcilers::finalizers::{ensure_finalizer, remove_finalizer};
//! use kube::Client;
//!
//! async fn example(client: Client, backend: Backend) -> anyhow::Result<()> {
//!     ensure_finalizer(&client, &backend, BACKEND_FINALIZER).await?;
//!     // ... teardown ...
//!     remove_finalizer(&client, &backend, BACKEND_FINALIZER).await?;
//!     Ok(())
//! }
//! ```

use anyhow::Result;
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::json;
use tracing::info;

/// The finalizer list with `finalizer` appended, or `None` if it is already present.
#[must_use]
pub fn finalizers_with(current: &[String], finalizer: &str) -> Option<Vec<String>> {
    if current.iter().any(|f| f == finalizer) {
        return None;
    }
    let mut finalizers = current.to_vec();
    finalizers.push(finalizer.to_string());
    Some(finalizers)
}

/// The finalizer list without `finalizer`, or `None` if it was not present.
#[must_use]
pub fn finalizers_without(current: &[String], finalizer: &str) -> Option<Vec<String>> {
    if !current.iter().any(|f| f == finalizer) {
        return None;
    }
    Some(
        current
            .iter()
            .filter(|f| f.as_str() != finalizer)
            .cloned()
            .collect(),
    )
}

async fn patch_finalizers<T>(client: &Client, resource: &T, finalizers: &[String]) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let namespace = resource.namespace().unwrap_or_default();
    let api: Api<T> = Api::namespaced(client.clone(), &namespace);
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch(
        &resource.name_any(),
        &PatchParams::default(),
        &Patch::Merge(&patch),
    )
    .await?;
    Ok(())
}

/// Add a finalizer to a resource if not already present.
///
/// # Errors
///
/// Returns an error if the API patch operation fails.
pub async fn ensure_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let Some(finalizers) = finalizers_with(resource.finalizers(), finalizer) else {
        return Ok(());
    };

    info!(
        kind = %T::kind(&()),
        namespace = %resource.namespace().unwrap_or_default(),
        name = %resource.name_any(),
        finalizer = %finalizer,
        "Adding finalizer"
    );
    patch_finalizers(client, resource, &finalizers).await
}

/// Remove a finalizer from a resource if present.
///
/// # Errors
///
/// Returns an error if the API patch operation fails.
pub async fn remove_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let Some(finalizers) = finalizers_without(resource.finalizers(), finalizer) else {
        return Ok(());
    };

    info!(
        kind = %T::kind(&()),
        namespace = %resource.namespace().unwrap_or_default(),
        name = %resource.name_any(),
        finalizer = %finalizer,
        "Removing finalizer"
    );
    patch_finalizers(client, resource, &finalizers).await
}
