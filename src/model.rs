// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Domain model between the `Backend` resource and the Data Plane API.
//!
//! A [`DesiredBackend`] is a validated `Backend` spec whose servers are either
//! static or still to be resolved from a Service. Resolving every dynamic entry
//! yields a [`ResolvedBackend`], which only holds static servers and converts
//! directly into wire models.

use crate::crd::{AdvCheck, BackendMode, BalanceAlgorithm, CheckMode, HttpCheckSpec};
use crate::haproxy::types::{Backend, Balance, HttpCheck, ReturnHeader, Server};
use crate::reconcilers::index::ObjectKey;
use std::collections::BTreeSet;
use std::fmt;

/// A server with a concrete address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticServer {
    pub name: String,
    pub address: String,
    pub port: Option<u16>,
    pub id: Option<i64>,
    pub check: Option<CheckMode>,
}

impl StaticServer {
    /// Wire model for this server.
    #[must_use]
    pub fn to_wire(&self) -> Server {
        Server {
            name: self.name.clone(),
            address: self.address.clone(),
            port: self.port.map(i64::from),
            id: self.id,
            check: self.check.map(|c| c.as_str().to_string()),
        }
    }
}

/// Port of a Service, by number or by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServicePort {
    Number(u16),
    Name(String),
}

impl ServicePort {
    /// Numeric strings become [`ServicePort::Number`], anything else a name.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        raw.parse::<u16>()
            .map_or_else(|_| Self::Name(raw.to_string()), Self::Number)
    }
}

impl fmt::Display for ServicePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// Servers to be resolved from the ready endpoints of a Service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DynamicServer {
    /// Namespace of the Service, already defaulted to the Backend's namespace.
    pub namespace: String,
    pub service_name: String,
    pub service_port: Option<ServicePort>,
    /// Port of the entry itself. Takes precedence over `service_port`.
    pub port: Option<u16>,
    pub check: Option<CheckMode>,
}

impl DynamicServer {
    #[must_use]
    pub fn service_key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, &self.service_name)
    }
}

/// One entry of a desired server list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerEntry {
    Static(StaticServer),
    Dynamic(DynamicServer),
}

/// A validated `Backend` spec.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DesiredBackend {
    pub name: String,
    pub mode: Option<BackendMode>,
    pub balance_algorithm: Option<BalanceAlgorithm>,
    pub health_check: Option<AdvCheck>,
    pub servers: Vec<ServerEntry>,
    pub http_checks: Vec<HttpCheckSpec>,
}

impl DesiredBackend {
    /// Services referenced by dynamic entries.
    #[must_use]
    pub fn service_keys(&self) -> BTreeSet<ObjectKey> {
        self.servers
            .iter()
            .filter_map(|entry| match entry {
                ServerEntry::Dynamic(dynamic) => Some(dynamic.service_key()),
                ServerEntry::Static(_) => None,
            })
            .collect()
    }

    /// Replace the server list with fully resolved servers.
    #[must_use]
    pub fn into_resolved(self, servers: Vec<StaticServer>) -> ResolvedBackend {
        ResolvedBackend {
            name: self.name,
            mode: self.mode,
            balance_algorithm: self.balance_algorithm,
            health_check: self.health_check,
            servers,
            http_checks: self.http_checks,
        }
    }
}

/// A desired backend with every server resolved to a concrete address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedBackend {
    pub name: String,
    pub mode: Option<BackendMode>,
    pub balance_algorithm: Option<BalanceAlgorithm>,
    pub health_check: Option<AdvCheck>,
    pub servers: Vec<StaticServer>,
    pub http_checks: Vec<HttpCheckSpec>,
}

impl ResolvedBackend {
    /// Wire model of the backend section. The description is stamped by the client.
    #[must_use]
    pub fn to_wire_backend(&self) -> Backend {
        Backend {
            name: self.name.clone(),
            mode: self.mode.map(|m| m.as_str().to_string()),
            balance: self.balance_algorithm.map(|a| Balance {
                algorithm: Some(a.as_str().to_string()),
            }),
            adv_check: self.health_check.map(|c| c.as_str().to_string()),
            description: None,
        }
    }

    #[must_use]
    pub fn wire_servers(&self) -> Vec<Server> {
        self.servers.iter().map(StaticServer::to_wire).collect()
    }

    #[must_use]
    pub fn wire_http_checks(&self) -> Vec<HttpCheck> {
        self.http_checks
            .iter()
            .map(|check| HttpCheck {
                check_type: check.check_type.as_str().to_string(),
                method: check.method.map(|m| m.as_str().to_string()),
                uri: check.uri.clone(),
                headers: check
                    .headers
                    .iter()
                    .map(|h| ReturnHeader {
                        name: Some(h.name.clone()),
                        fmt: Some(h.fmt.clone()),
                    })
                    .collect(),
            })
            .collect()
    }
}
