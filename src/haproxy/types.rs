// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Wire models for the HAProxy Data Plane API v3.
//!
//! Only the fields this operator reads or writes are modelled. Unknown fields in
//! responses are ignored, and optional fields are omitted from request bodies.

use serde::{Deserialize, Serialize};

/// A backend section.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backend {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Balance>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adv_check: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Load-balancing settings of a backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
}

/// One `http-check` step of a backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpCheck {
    #[serde(rename = "type")]
    pub check_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<ReturnHeader>,
}

/// Header sent by an `http-check send` step.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnHeader {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub fmt: Option<String>,
}

/// A server inside a backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub name: String,

    #[serde(default)]
    pub address: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// `enabled` or `disabled`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,
}

/// A frontend section.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frontend {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_backend: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A listening address of a frontend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bind {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
}

/// A `use_backend` rule of a frontend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSwitchingRule {
    /// Target backend
    pub name: String,

    /// `if` or `unless`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cond: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cond_test: Option<String>,
}

/// A configuration transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,

    #[serde(rename = "_version", default)]
    pub version: i64,

    #[serde(default)]
    pub status: String,
}

/// Treats `None` and `Some("")` alike when comparing optional strings.
pub(crate) fn opt_str(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}
