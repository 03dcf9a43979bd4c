// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resolution of dynamic server entries into concrete servers.
//!
//! Each dynamic entry names a Service. Its `EndpointSlices` are listed in order,
//! every endpoint with an address is run through a liveness filter, and each
//! survivor becomes one static server. Resolution is all-or-nothing: a missing
//! Service, a Service without slices, a Service whose every endpoint was filtered
//! out, or any lookup error fails the whole pass.
//!
//! # Liveness filter
//!
//! An endpoint is dropped when:
//! - its slice marks it as terminating, or
//! - it targets a Pod that has a deletion timestamp, is not in phase `Running`, or
//!   whose `Ready` condition is not `True`.
//!
//! A Pod that no longer exists, or whose lookup fails, cannot be judged and the
//! endpoint is kept. Lookup errors for the Service or its slices abort the pass.

use crate::constants::{
    CONDITION_STATUS_TRUE, KIND_POD, POD_CONDITION_READY, POD_PHASE_RUNNING, SERVICE_NAME_LABEL,
};
use crate::errors::BackendError;
use crate::model::{
    DesiredBackend, DynamicServer, ResolvedBackend, ServerEntry, ServicePort, StaticServer,
};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, Service};
use k8s_openapi::api::discovery::v1::{Endpoint, EndpointSlice};
use kube::api::ListParams;
use kube::{Api, Client};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Read access to Services, `EndpointSlices` and Pods.
#[async_trait]
pub trait MembershipLookup: Send + Sync {
    /// Fetch a Service. `None` if it does not exist.
    async fn get_service(&self, namespace: &str, name: &str) -> anyhow::Result<Option<Service>>;

    /// List the `EndpointSlices` owned by a Service.
    async fn list_endpoint_slices(
        &self,
        namespace: &str,
        service: &str,
    ) -> anyhow::Result<Vec<EndpointSlice>>;

    /// Fetch a Pod. `None` if it does not exist.
    async fn get_pod(&self, namespace: &str, name: &str) -> anyhow::Result<Option<Pod>>;
}

/// [`MembershipLookup`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeMembershipLookup {
    client: Client,
}

impl KubeMembershipLookup {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MembershipLookup for KubeMembershipLookup {
    async fn get_service(&self, namespace: &str, name: &str) -> anyhow::Result<Option<Service>> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn list_endpoint_slices(
        &self,
        namespace: &str,
        service: &str,
    ) -> anyhow::Result<Vec<EndpointSlice>> {
        let api: Api<EndpointSlice> = Api::namespaced(self.client.clone(), namespace);
        let params = ListParams::default().labels(&format!("{SERVICE_NAME_LABEL}={service}"));
        Ok(api.list(&params).await?.items)
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> anyhow::Result<Option<Pod>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }
}

/// Returns true if `pod` is running, ready and not being deleted.
#[must_use]
pub fn pod_is_live(pod: &Pod) -> bool {
    if pod.metadata.deletion_timestamp.is_some() {
        return false;
    }
    let Some(status) = &pod.status else {
        return false;
    };
    if status.phase.as_deref() != Some(POD_PHASE_RUNNING) {
        return false;
    }
    status
        .conditions
        .iter()
        .flatten()
        .any(|c| c.type_ == POD_CONDITION_READY && c.status == CONDITION_STATUS_TRUE)
}

/// Name for a server synthesized from `endpoint`: the target object's name, else
/// the node name, else the address.
///
/// The Pod name comes first because several Pods of one Service can run on the
/// same node, and naming by node would collapse them into a single server.
fn endpoint_server_name(endpoint: &Endpoint, address: &str) -> String {
    endpoint
        .target_ref
        .as_ref()
        .and_then(|t| t.name.clone())
        .or_else(|| endpoint.node_name.clone())
        .unwrap_or_else(|| address.to_string())
}

/// Port for servers of `dynamic` resolved from `slice`.
fn resolve_port(dynamic: &DynamicServer, slice: &EndpointSlice) -> Option<u16> {
    if dynamic.port.is_some() {
        return dynamic.port;
    }
    match dynamic.service_port.as_ref()? {
        ServicePort::Number(n) => Some(*n),
        ServicePort::Name(name) => slice
            .ports
            .iter()
            .flatten()
            .find(|p| p.name.as_deref() == Some(name.as_str()))
            .and_then(|p| p.port)
            .and_then(|p| u16::try_from(p).ok()),
    }
}

async fn endpoint_is_live(
    lookup: &dyn MembershipLookup,
    service_namespace: &str,
    endpoint: &Endpoint,
) -> bool {
    if endpoint
        .conditions
        .as_ref()
        .and_then(|c| c.terminating)
        .unwrap_or(false)
    {
        return false;
    }

    let Some(target) = endpoint
        .target_ref
        .as_ref()
        .filter(|t| t.kind.as_deref() == Some(KIND_POD))
    else {
        return true;
    };
    let Some(pod_name) = target.name.as_deref() else {
        return true;
    };
    let pod_namespace = target.namespace.as_deref().unwrap_or(service_namespace);

    match lookup.get_pod(pod_namespace, pod_name).await {
        Ok(Some(pod)) => pod_is_live(&pod),
        Ok(None) => {
            debug!(namespace = %pod_namespace, pod = %pod_name, "Endpoint Pod not found, keeping endpoint");
            true
        }
        Err(e) => {
            warn!(
                namespace = %pod_namespace,
                pod = %pod_name,
                error = %e,
                "Failed to look up endpoint Pod, keeping endpoint"
            );
            true
        }
    }
}

async fn resolve_dynamic(
    lookup: &dyn MembershipLookup,
    dynamic: &DynamicServer,
) -> Result<Vec<StaticServer>, BackendError> {
    let namespace = dynamic.namespace.as_str();
    let service = dynamic.service_name.as_str();

    let found = lookup
        .get_service(namespace, service)
        .await
        .map_err(|source| BackendError::MembershipLookup {
            what: format!("Service {namespace}/{service}"),
            source,
        })?;
    if found.is_none() {
        return Err(BackendError::ServiceNotFound {
            namespace: namespace.to_string(),
            name: service.to_string(),
        });
    }

    let slices = lookup
        .list_endpoint_slices(namespace, service)
        .await
        .map_err(|source| BackendError::MembershipLookup {
            what: format!("EndpointSlices of Service {namespace}/{service}"),
            source,
        })?;
    if slices.is_empty() {
        return Err(BackendError::EndpointsNotFound {
            namespace: namespace.to_string(),
            name: service.to_string(),
        });
    }

    let mut servers = Vec::new();
    let mut skipped = 0usize;
    for slice in &slices {
        let port = resolve_port(dynamic, slice);
        for endpoint in &slice.endpoints {
            let Some(address) = endpoint.addresses.first() else {
                continue;
            };
            if !endpoint_is_live(lookup, namespace, endpoint).await {
                skipped += 1;
                continue;
            }
            servers.push(StaticServer {
                name: endpoint_server_name(endpoint, address),
                address: address.clone(),
                port,
                id: None,
                check: dynamic.check,
            });
        }
    }

    if servers.is_empty() {
        return Err(BackendError::NoUsableEndpoints {
            namespace: namespace.to_string(),
            name: service.to_string(),
        });
    }

    info!(
        service = %dynamic.service_key(),
        resolved = servers.len(),
        skipped = skipped,
        "Resolved servers from Service"
    );
    Ok(servers)
}

/// Replace every dynamic entry of `desired` with the servers resolved from its Service.
///
/// Static entries are copied unchanged and order is preserved. If two entries
/// produce the same server name, the first one wins.
///
/// # Errors
///
/// Returns [`BackendError::ServiceNotFound`], [`BackendError::EndpointsNotFound`],
/// [`BackendError::NoUsableEndpoints`] or [`BackendError::MembershipLookup`] for the
/// first dynamic entry that cannot be resolved.
pub async fn resolve_backend(
    desired: DesiredBackend,
    lookup: &dyn MembershipLookup,
) -> Result<ResolvedBackend, BackendError> {
    let mut servers = Vec::with_capacity(desired.servers.len());
    let mut names = HashSet::new();

    for entry in &desired.servers {
        let resolved = match entry {
            ServerEntry::Static(server) => vec![server.clone()],
            ServerEntry::Dynamic(dynamic) => resolve_dynamic(lookup, dynamic).await?,
        };
        for server in resolved {
            if names.insert(server.name.clone()) {
                servers.push(server);
            } else {
                debug!(backend = %desired.name, server = %server.name, "Dropping duplicate server name");
            }
        }
    }

    Ok(desired.into_resolved(servers))
}
