// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `Backend` controller wiring.
//!
//! The controller watches `Backend` resources and, through the
//! [`ServiceIndex`](crate::reconcilers::index::ServiceIndex), re-triggers every
//! `Backend` that references a `Service` whenever that Service or one of its
//! `EndpointSlices` changes.
//!
//! When the operator is scoped to several namespaces, one controller runs per
//! namespace and all of them share the same [`Context`]. Services and
//! `EndpointSlices` are always watched cluster-wide, since a `Backend` may
//! reference a Service in any namespace. Each controller keeps only the
//! re-triggers for Backends in its own namespace.

use crate::constants::{
    CONFLICT_REQUEUE_DURATION_SECS, ERROR_REQUEUE_DURATION_SECS, SUCCESS_REQUEUE_DURATION_SECS,
};
use crate::context::Context;
use crate::crd::Backend;
use crate::errors::BackendError;
use crate::reconcilers::backend::{reconcile_backend, ReconcileOutcome};
use crate::reconcilers::index::ObjectKey;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::discovery::v1::EndpointSlice;
use kube::runtime::controller::Action;
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher::Config;
use kube::runtime::Controller;
use kube::{Api, Client, ResourceExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ReconcileError(#[from] BackendError);

/// Which `Backend` resources the operator manages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WatchScope {
    /// Namespaces to watch. Empty means all namespaces.
    pub namespaces: Vec<String>,
    /// Label selector (`key=value`) restricting watched Backends.
    pub label_selector: Option<String>,
}

/// Delay before the next pass after a successful one. `None` waits for a change.
#[must_use]
pub fn requeue_after_outcome(outcome: &ReconcileOutcome) -> Option<Duration> {
    match outcome {
        ReconcileOutcome::Synced(_) => Some(Duration::from_secs(SUCCESS_REQUEUE_DURATION_SECS)),
        ReconcileOutcome::Absent | ReconcileOutcome::Finalized => None,
    }
}

/// Delay before retrying a failed pass. `None` waits for a change of the resource.
#[must_use]
pub fn requeue_after_error(err: &BackendError) -> Option<Duration> {
    if err.needs_intervention() {
        None
    } else if err.is_conflict() {
        Some(Duration::from_secs(CONFLICT_REQUEUE_DURATION_SECS))
    } else {
        Some(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
    }
}

fn to_action(delay: Option<Duration>) -> Action {
    delay.map_or_else(Action::await_change, Action::requeue)
}

fn object_ref(key: ObjectKey) -> ObjectRef<Backend> {
    ObjectRef::new(&key.name).within(&key.namespace)
}

/// Backends to re-trigger for a controller that owns `namespace` (`None` owns
/// every namespace).
#[must_use]
pub fn retrigger_refs(keys: Vec<ObjectKey>, namespace: Option<&str>) -> Vec<ObjectRef<Backend>> {
    keys.into_iter()
        .filter(|key| namespace.is_none_or(|ns| key.namespace == ns))
        .map(object_ref)
        .collect()
}

async fn reconcile(backend: Arc<Backend>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let namespace = backend.namespace().unwrap_or_default();
    let name = backend.name_any();
    debug!(namespace = %namespace, name = %name, "Reconcile wrapper called for Backend");

    let start = Instant::now();
    let result = reconcile_backend(&ctx, &namespace, &name).await;
    let label = result.as_ref().map_or("error", ReconcileOutcome::label);
    ctx.metrics.reconciliation(label, start.elapsed());

    match result {
        Ok(outcome) => Ok(to_action(requeue_after_outcome(&outcome))),
        Err(e) => Err(e.into()),
    }
}

fn error_policy(backend: Arc<Backend>, err: &ReconcileError, _ctx: Arc<Context>) -> Action {
    error!(
        namespace = ?backend.namespace(),
        name = %backend.name_any(),
        error = %err,
        "Failed to reconcile Backend"
    );
    to_action(requeue_after_error(&err.0))
}

fn watcher_config(scope: &WatchScope) -> Config {
    match &scope.label_selector {
        Some(selector) => Config::default().labels(selector),
        None => Config::default(),
    }
}

async fn run_controller(
    client: Client,
    namespace: Option<String>,
    config: Config,
    ctx: Arc<Context>,
) {
    let backends: Api<Backend> = match &namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };
    let services: Api<Service> = Api::all(client.clone());
    let slices: Api<EndpointSlice> = Api::all(client);

    let service_index = ctx.index.clone();
    let service_namespace = namespace.clone();
    let slice_index = ctx.index.clone();
    let slice_namespace = namespace;

    Controller::new(backends, config)
        .watches(services, Config::default(), move |service| {
            retrigger_refs(
                service_index.backends_for_service(&service),
                service_namespace.as_deref(),
            )
        })
        .watches(slices, Config::default(), move |slice| {
            retrigger_refs(
                slice_index.backends_for_endpoint_slice(&slice),
                slice_namespace.as_deref(),
            )
        })
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| {
            if let Err(e) = result {
                debug!(error = %e, "Controller reported an error");
            }
            futures::future::ready(())
        })
        .await;
}

/// Run the `Backend` controller until shutdown.
pub async fn run_backend_controller(client: Client, ctx: Arc<Context>, scope: WatchScope) {
    let config = watcher_config(&scope);

    if scope.namespaces.is_empty() {
        info!("Starting Backend controller for all namespaces");
        run_controller(client, None, config, ctx).await;
        return;
    }

    info!(namespaces = ?scope.namespaces, "Starting Backend controllers");
    let controllers = scope.namespaces.iter().map(|namespace| {
        run_controller(
            client.clone(),
            Some(namespace.clone()),
            config.clone(),
            ctx.clone(),
        )
    });
    futures::future::join_all(controllers).await;
}
