// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Turns a `Backend` spec into a [`DesiredBackend`], rejecting malformed entries.

use crate::crd::{BackendSpec, ServerSpec};
use crate::errors::BackendError;
use crate::model::{DesiredBackend, DynamicServer, ServerEntry, ServicePort, StaticServer};
use std::collections::HashSet;

/// Returns true for a non-empty name made of `A-Z a-z 0-9 - _ . :`.
#[must_use]
pub fn is_valid_backend_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

fn validate_port(port: Option<i64>) -> Result<Option<u16>, String> {
    match port {
        None => Ok(None),
        Some(p) => u16::try_from(p)
            .ok()
            .filter(|p| *p >= 1)
            .map(Some)
            .ok_or_else(|| format!("port {p} is out of range 1-65535")),
    }
}

fn validate_server(server: &ServerSpec, namespace: &str) -> Result<ServerEntry, String> {
    let name = non_empty(server.name.as_ref());
    let address = non_empty(server.address.as_ref());
    let port = validate_port(server.port)?;

    match (&server.value_from, name, address) {
        (None, Some(name), Some(address)) => Ok(ServerEntry::Static(StaticServer {
            name: name.to_string(),
            address: address.to_string(),
            port,
            id: server.id,
            check: server.check,
        })),
        (None, _, _) => Err("either address/name or valueFrom must be set for server".to_string()),
        (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
            Err("only one of address/name or valueFrom may be set for server".to_string())
        }
        (Some(value_from), None, None) => {
            let service_ref = value_from
                .service_ref
                .as_ref()
                .ok_or_else(|| "valueFrom.serviceRef must be set".to_string())?;
            if service_ref.name.is_empty() {
                return Err("valueFrom.serviceRef.name must be set".to_string());
            }
            Ok(ServerEntry::Dynamic(DynamicServer {
                namespace: non_empty(service_ref.namespace.as_ref())
                    .unwrap_or(namespace)
                    .to_string(),
                service_name: service_ref.name.clone(),
                service_port: non_empty(service_ref.port.as_ref()).map(ServicePort::parse),
                port,
                check: server.check,
            }))
        }
    }
}

/// Validate `spec` and build the desired state. `namespace` is the namespace of the
/// `Backend`, used as the default for service references.
///
/// # Errors
///
/// Returns [`BackendError::Validation`] describing the first problem found.
pub fn validate_backend(spec: &BackendSpec, namespace: &str) -> Result<DesiredBackend, BackendError> {
    if !is_valid_backend_name(&spec.name) {
        return Err(BackendError::Validation(format!(
            "name {:?} must be non-empty and match ^[A-Za-z0-9-_.:]+$",
            spec.name
        )));
    }

    let mut servers = Vec::with_capacity(spec.servers.len());
    let mut static_names = HashSet::new();
    for (i, server) in spec.servers.iter().enumerate() {
        let entry = validate_server(server, namespace)
            .map_err(|e| BackendError::Validation(format!("server[{i}]: {e}")))?;
        if let ServerEntry::Static(s) = &entry {
            if !static_names.insert(s.name.clone()) {
                return Err(BackendError::Validation(format!(
                    "server[{i}]: duplicate server name {:?}",
                    s.name
                )));
            }
        }
        servers.push(entry);
    }

    Ok(DesiredBackend {
        name: spec.name.clone(),
        mode: spec.mode,
        balance_algorithm: spec.balance.as_ref().map(|b| b.algorithm),
        health_check: spec.adv_check,
        servers,
        http_checks: spec.http_check_list.clone(),
    })
}
