// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `Backend` reconciliation.
//!
//! One pass walks the resource through its lifecycle:
//!
//! 1. **Absent** - the resource is gone, nothing to do
//! 2. **Present** - validate, resolve dynamic servers, then open a transaction,
//!    synchronize the HAProxy backend and close the transaction (commit if
//!    anything was written, discard otherwise). The finalizer is attached once a
//!    pass succeeds.
//! 3. **Deleting** - delete the managed HAProxy backend in its own transaction,
//!    then detach the finalizer. A failed teardown keeps the finalizer so the next
//!    pass retries it.
//!
//! Every pass ends by upserting the `ReconcilingComplete` condition. Failures also
//! publish a `Warning` event.
//!
//! Resolution happens before the transaction is opened: the Data Plane API
//! serializes transactions globally, so a transaction is held only for the writes.

pub mod resolver;
pub mod store;
pub mod validation;

#[cfg(test)]
mod validation_tests;

use crate::constants::{CONDITION_STATUS_FALSE, CONDITION_STATUS_TRUE};
use crate::context::Context;
use crate::crd::Backend;
use crate::errors::BackendError;
use crate::haproxy::{CloseOutcome, HaproxyClient, SyncReport};
use crate::model::ResolvedBackend;
use crate::reconcilers::index::ObjectKey;
use crate::reconcilers::status::{BackendStatusUpdater, EventType};
use crate::status_reasons::{
    CONDITION_TYPE_RECONCILING_COMPLETE, REASON_FINALIZED, REASON_RECONCILE_COMPLETED,
    REASON_SYNCED, REASON_TEARDOWN_FAILED,
};
use resolver::resolve_backend;
use tracing::{debug, info, warn};
use validation::validate_backend;

/// What a reconcile pass did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The resource no longer exists.
    Absent,
    /// The HAProxy backend matches the resource.
    Synced(SyncReport),
    /// The HAProxy backend was removed and the finalizer detached.
    Finalized,
}

impl ReconcileOutcome {
    /// Metric label for the outcome.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Synced(_) => "synced",
            Self::Finalized => "finalized",
        }
    }
}

/// Reconcile the `Backend` `namespace/name`.
///
/// # Errors
///
/// Returns the error that aborted the pass. By the time it is returned the
/// condition has been written and a `Warning` event published.
pub async fn reconcile_backend(
    ctx: &Context,
    namespace: &str,
    name: &str,
) -> Result<ReconcileOutcome, BackendError> {
    let key = ObjectKey::new(namespace, name);

    let Some(backend) = ctx
        .store
        .get(namespace, name)
        .await
        .map_err(BackendError::Kubernetes)?
    else {
        debug!(backend = %key, "Backend no longer exists");
        ctx.index.remove(&key);
        return Ok(ReconcileOutcome::Absent);
    };

    if backend.is_deleting() {
        return finalize_backend(ctx, &key, &backend).await;
    }

    info!(
        backend = %key,
        generation = ?backend.metadata.generation,
        "Reconciling Backend"
    );

    let mut result = sync_backend(ctx, &key, &backend).await;
    if result.is_ok() && !backend.has_finalizer() {
        if let Err(e) = ctx.store.add_finalizer(&backend).await {
            result = Err(BackendError::AddFinalizer(e));
        }
    }

    let mut updater = BackendStatusUpdater::new(&backend);
    updater.set_observed_generation(backend.metadata.generation);
    match &result {
        Ok(report) => {
            updater.set_condition(
                CONDITION_TYPE_RECONCILING_COMPLETE,
                CONDITION_STATUS_TRUE,
                REASON_RECONCILE_COMPLETED,
                &format!("Backend {} synchronized", backend.spec.name),
            );
            if report.has_changes() {
                ctx.store
                    .publish_event(&backend, EventType::Normal, REASON_SYNCED, &report.summary())
                    .await;
            }
        }
        Err(e) => {
            warn!(backend = %key, reason = e.status_reason(), error = %e, "Backend reconcile failed");
            let message = e.condition_message();
            updater.set_condition(
                CONDITION_TYPE_RECONCILING_COMPLETE,
                CONDITION_STATUS_FALSE,
                e.status_reason(),
                &message,
            );
            ctx.store
                .publish_event(&backend, EventType::Warning, e.status_reason(), &message)
                .await;
        }
    }

    let status_result = write_status(ctx, &backend, &updater).await;
    let report = result?;
    status_result?;

    info!(backend = %key, changes = %report.summary(), "Backend reconciled");
    Ok(ReconcileOutcome::Synced(report))
}

/// Validate, resolve and apply `backend` in one transaction.
async fn sync_backend(
    ctx: &Context,
    key: &ObjectKey,
    backend: &Backend,
) -> Result<SyncReport, BackendError> {
    let desired = match validate_backend(&backend.spec, &key.namespace) {
        Ok(desired) => desired,
        Err(e) => {
            ctx.index.remove(key);
            return Err(e);
        }
    };
    ctx.index.update(key, desired.service_keys());

    let resolved = resolve_backend(desired, ctx.lookup.as_ref()).await?;
    debug!(backend = %key, servers = resolved.servers.len(), "Resolved Backend");

    apply_backend(&ctx.haproxy, &resolved).await
}

/// Synchronize `resolved` inside a transaction. The transaction is discarded if
/// any step fails, including a rejected commit.
///
/// # Errors
///
/// Returns the first error from opening, synchronizing or closing.
pub async fn apply_backend(
    haproxy: &HaproxyClient,
    resolved: &ResolvedBackend,
) -> Result<SyncReport, BackendError> {
    let mut session = haproxy.session();
    session.open().await?;

    let report = match session.ensure_backend(resolved).await {
        Ok(report) => report,
        Err(e) => {
            session.abort().await;
            return Err(e.into());
        }
    };

    let outcome = match session.close().await {
        Ok(outcome) => outcome,
        Err(e) => {
            session.abort().await;
            return Err(e.into());
        }
    };
    match outcome {
        CloseOutcome::Committed(tx) => {
            info!(backend = %resolved.name, transaction_id = %tx.id, "Committed Backend changes");
        }
        CloseOutcome::Discarded => {
            debug!(backend = %resolved.name, "No changes, discarded transaction");
        }
    }
    Ok(report)
}

/// Delete the managed HAProxy backend `name` inside a transaction. An absent
/// backend counts as deleted.
///
/// # Errors
///
/// Returns [`BackendError::Haproxy`] if the backend is foreign or any call fails.
pub async fn teardown_backend(haproxy: &HaproxyClient, name: &str) -> Result<(), BackendError> {
    let mut session = haproxy.session();
    session.open().await?;

    let result = match session.delete_backend(name).await {
        Ok(_) => session.close().await.map(|_| ()),
        Err(e) => Err(e),
    };
    if result.is_err() {
        session.abort().await;
    }
    result.map_err(BackendError::from)
}

async fn finalize_backend(
    ctx: &Context,
    key: &ObjectKey,
    backend: &Backend,
) -> Result<ReconcileOutcome, BackendError> {
    if !backend.has_finalizer() {
        debug!(backend = %key, "Backend is deleting without our finalizer");
        ctx.index.remove(key);
        return Ok(ReconcileOutcome::Finalized);
    }

    info!(backend = %key, haproxy_backend = %backend.spec.name, "Tearing down Backend");

    if let Err(e) = teardown_backend(&ctx.haproxy, &backend.spec.name).await {
        warn!(backend = %key, error = %e, "Backend teardown failed, keeping finalizer");
        let message = format!("teardown failed: {}", e.condition_message());
        record_finalize_failure(ctx, key, backend, &e, REASON_TEARDOWN_FAILED, &message).await;
        return Err(e);
    }

    if let Err(source) = ctx.store.remove_finalizer(backend).await {
        let e = BackendError::RemoveFinalizer(source);
        warn!(backend = %key, error = %e, "HAProxy backend deleted but finalizer removal failed");
        let message = e.condition_message();
        record_finalize_failure(ctx, key, backend, &e, e.status_reason(), &message).await;
        return Err(e);
    }
    ctx.index.remove(key);
    ctx.store
        .publish_event(
            backend,
            EventType::Normal,
            REASON_FINALIZED,
            &format!("HAProxy backend {} deleted", backend.spec.name),
        )
        .await;

    info!(backend = %key, "Backend finalized");
    Ok(ReconcileOutcome::Finalized)
}

/// Record a failed finalization as a `False` condition and a `Warning` event.
/// The status write is best-effort: the finalization error is what gets returned.
async fn record_finalize_failure(
    ctx: &Context,
    key: &ObjectKey,
    backend: &Backend,
    err: &BackendError,
    event_reason: &str,
    message: &str,
) {
    let mut updater = BackendStatusUpdater::new(backend);
    updater.set_observed_generation(backend.metadata.generation);
    updater.set_condition(
        CONDITION_TYPE_RECONCILING_COMPLETE,
        CONDITION_STATUS_FALSE,
        err.status_reason(),
        message,
    );
    ctx.store
        .publish_event(backend, EventType::Warning, event_reason, message)
        .await;
    if let Err(status_err) = write_status(ctx, backend, &updater).await {
        warn!(backend = %key, error = %status_err, "Failed to record finalization failure");
    }
}

async fn write_status(
    ctx: &Context,
    backend: &Backend,
    updater: &BackendStatusUpdater,
) -> Result<(), BackendError> {
    let Some(status) = updater.pending() else {
        debug!(name = %backend.spec.name, "Status unchanged, skipping patch");
        return Ok(());
    };
    ctx.store
        .patch_status(backend, status)
        .await
        .map_err(BackendError::Kubernetes)
}
