// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for HAProxy configuration management.
//!
//! This module defines the [`Backend`] custom resource, which declares one HAProxy
//! backend section together with its health checks and member servers. Servers are
//! either listed statically or resolved at reconcile time from the endpoints of a
//! Kubernetes `Service`.
//!
//! # Example: A backend with a static and a dynamic server
//!
//! ```yaml
//! apiVersion: haproxy.firestoned.io/v1alpha1
//! kind: Backend
//! metadata:
//!   name: web
//!   namespace: default
//! spec:
//!   name: web
//!   balance:
//!     algorithm: roundrobin
//!   advCheck: httpchk
//!   servers:
//!     - name: s1
//!       address: 10.0.0.1
//!       port: 8080
//!     - valueFrom:
//!         serviceRef:
//!           name: web-svc
//!           port: http
//!       port: 8080
//!   httpCheckList:
//!     - type: send
//!       method: GET
//!       uri: /healthz
//!       headers:
//!         - name: Host
//!           fmt: web.example.com
//!     - type: expect
//! ```

use crate::constants::BACKEND_FINALIZER;
use kube::{CustomResource, CustomResourceExt, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the generated `Backend` CRD manifest.
pub const BACKEND_CRD_FILE: &str = "backends.crd.yaml";

const CRD_FILE_HEADER: &str = "# Copyright (c) 2025 Erick Bourgeois, firestoned
# SPDX-License-Identifier: MIT
#
# This file is AUTO-GENERATED from src/crd.rs
# DO NOT EDIT MANUALLY - Run `cargo run --bin crdgen` to regenerate
#
";

/// Proxy mode of a backend.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    Http,
    Tcp,
}

impl BackendMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Tcp => "tcp",
        }
    }
}

/// Load-balancing algorithm.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum BalanceAlgorithm {
    #[serde(rename = "first")]
    First,
    #[serde(rename = "hash")]
    Hash,
    #[serde(rename = "hdr")]
    Hdr,
    #[serde(rename = "leastconn")]
    LeastConn,
    #[serde(rename = "random")]
    Random,
    #[serde(rename = "rdp-cookie")]
    RdpCookie,
    #[serde(rename = "roundrobin")]
    RoundRobin,
    #[serde(rename = "source")]
    Source,
    #[serde(rename = "static-rr")]
    StaticRr,
    #[serde(rename = "uri")]
    Uri,
    #[serde(rename = "url_param")]
    UrlParam,
}

impl BalanceAlgorithm {
    /// Value as understood by HAProxy.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Hash => "hash",
            Self::Hdr => "hdr",
            Self::LeastConn => "leastconn",
            Self::Random => "random",
            Self::RdpCookie => "rdp-cookie",
            Self::RoundRobin => "roundrobin",
            Self::Source => "source",
            Self::StaticRr => "static-rr",
            Self::Uri => "uri",
            Self::UrlParam => "url_param",
        }
    }
}

/// Load-balancing settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct Balance {
    /// Algorithm used to pick a server.
    pub algorithm: BalanceAlgorithm,
}

/// Protocol-specific health check (`option <check>`).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum AdvCheck {
    #[serde(rename = "httpchk")]
    HttpChk,
    #[serde(rename = "ldap-check")]
    LdapCheck,
    #[serde(rename = "mysql-check")]
    MysqlCheck,
    #[serde(rename = "pgsql-check")]
    PgsqlCheck,
    #[serde(rename = "redis-check")]
    RedisCheck,
    #[serde(rename = "smtpchk")]
    SmtpChk,
    #[serde(rename = "ssl-hello-chk")]
    SslHelloChk,
    #[serde(rename = "tcp-check")]
    TcpCheck,
}

impl AdvCheck {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HttpChk => "httpchk",
            Self::LdapCheck => "ldap-check",
            Self::MysqlCheck => "mysql-check",
            Self::PgsqlCheck => "pgsql-check",
            Self::RedisCheck => "redis-check",
            Self::SmtpChk => "smtpchk",
            Self::SslHelloChk => "ssl-hello-chk",
            Self::TcpCheck => "tcp-check",
        }
    }
}

/// Whether HAProxy health-checks a server.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CheckMode {
    Enabled,
    Disabled,
}

impl CheckMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
        }
    }
}

/// Reference to a `Service` whose ready endpoints become servers.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRef {
    /// Namespace of the Service. Defaults to the namespace of the Backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Name of the Service.
    pub name: String,

    /// Port number or port name of the Service. Used when the server entry has no
    /// port of its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

/// Source of dynamically resolved servers.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServerValueFrom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_ref: Option<ServiceRef>,
}

/// One entry of `spec.servers`.
///
/// Either `name` and `address` are set (a static server) or `valueFrom` is set
/// (servers resolved from a Service). Setting both, or neither, is rejected.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServerSpec {
    /// Server name, unique within the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(pattern = r"^[^\s]+$"))]
    pub name: Option<String>,

    /// IP address or hostname.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(pattern = r"^[^\s]+$"))]
    pub address: Option<String>,

    /// Port HAProxy connects to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 65535))]
    pub port: Option<i64>,

    /// Numeric server id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Health-check mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<CheckMode>,

    /// Resolve servers from a Service instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<ServerValueFrom>,
}

/// Type of an `http-check` step.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum HttpCheckType {
    Comment,
    Connect,
    #[serde(rename = "disable-on-404")]
    DisableOn404,
    Expect,
    Send,
    SendState,
    SetVar,
    SetVarFmt,
    UnsetVar,
}

impl HttpCheckType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Connect => "connect",
            Self::DisableOn404 => "disable-on-404",
            Self::Expect => "expect",
            Self::Send => "send",
            Self::SendState => "send-state",
            Self::SetVar => "set-var",
            Self::SetVarFmt => "set-var-fmt",
            Self::UnsetVar => "unset-var",
        }
    }
}

/// HTTP verb of an `http-check send` step.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Head,
    Put,
    Post,
    Get,
    Trace,
    Patch,
    Delete,
    Connect,
    Options,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Head => "HEAD",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Get => "GET",
            Self::Trace => "TRACE",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Connect => "CONNECT",
            Self::Options => "OPTIONS",
        }
    }
}

/// Header sent by an `http-check send` step.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct CheckHeader {
    pub name: String,

    /// Log-format string producing the header value.
    pub fmt: String,
}

/// One `http-check` step. Steps run in the order they are listed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct HttpCheckSpec {
    #[serde(rename = "type")]
    pub check_type: HttpCheckType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<HttpMethod>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<CheckHeader>,
}

/// `Backend` declares one HAProxy backend section.
///
/// The operator creates the backend through the Data Plane API, stamps it as
/// managed, and keeps its balance settings, health checks and server set in sync.
/// A backend that already exists on HAProxy without the managed description is
/// never modified.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "haproxy.firestoned.io",
    version = "v1alpha1",
    kind = "Backend",
    namespaced,
    doc = "Backend declares an HAProxy backend section whose servers are listed statically or resolved from the ready endpoints of a Kubernetes Service.",
    printcolumn = r#"{"name":"HAProxy Name","type":"string","jsonPath":".spec.name"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='ReconcilingComplete')].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[kube(status = "BackendStatus")]
#[serde(rename_all = "camelCase")]
pub struct BackendSpec {
    /// Name of the backend section on HAProxy.
    #[schemars(regex(pattern = r"^[A-Za-z0-9-_.:]+$"))]
    pub name: String,

    /// Proxy mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<BackendMode>,

    /// Load-balancing settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Balance>,

    /// Protocol-specific health check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adv_check: Option<AdvCheck>,

    /// Member servers, static or resolved from a Service.
    #[serde(default)]
    pub servers: Vec<ServerSpec>,

    /// Ordered `http-check` steps.
    #[serde(default)]
    pub http_check_list: Vec<HttpCheckSpec>,
}

/// Condition represents an observation of a resource's current state.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// `Backend` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackendStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl Backend {
    /// Returns true if deletion has been requested.
    #[must_use]
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Returns true if the operator's finalizer is attached.
    #[must_use]
    pub fn has_finalizer(&self) -> bool {
        self.finalizers().iter().any(|f| f == BACKEND_FINALIZER)
    }
}

/// Render the `Backend` CRD as YAML with the generated-file header.
///
/// # Errors
///
/// Returns an error if the CRD cannot be serialized.
pub fn backend_crd_yaml() -> Result<String, serde_yaml::Error> {
    let crd = Backend::crd();
    let yaml = serde_yaml::to_string(&crd)?;
    Ok(format!("{CRD_FILE_HEADER}{yaml}"))
}

/// Write the `Backend` CRD manifest into `output_dir`, creating it if needed.
///
/// # Errors
///
/// Returns an error if the directory cannot be created, the CRD cannot be
/// serialized, or the file cannot be written.
pub fn write_crd_manifest(output_dir: &Path) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(BACKEND_CRD_FILE);
    fs::write(&path, backend_crd_yaml()?)?;
    Ok(path)
}
