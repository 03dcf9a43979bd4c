// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the HAProxy operator.
//!
//! This module provides two layers of errors:
//! - [`HaproxyError`] for failures talking to the HAProxy Data Plane API
//! - [`BackendError`] for failures of a whole `Backend` reconcile pass
//!
//! Both map onto condition reasons from [`crate::status_reasons`] so every failure
//! lands on the resource status with a stable, programmatic reason.

use crate::http_errors::{map_connection_error, map_http_error_to_reason};
use crate::status_reasons::{
    REASON_ADD_FINALIZER_FAILED, REASON_ENDPOINTS_LIST_ERROR, REASON_ENDPOINTS_NOT_FOUND,
    REASON_HAPROXY_CLIENT_ERROR, REASON_KUBERNETES_API_ERROR, REASON_NOT_MANAGED,
    REASON_NO_USABLE_ENDPOINTS, REASON_REMOVE_FINALIZER_FAILED, REASON_SERVICE_NOT_FOUND,
    REASON_TRANSACTION_CONFLICT, REASON_VALIDATION_ERROR,
};
use thiserror::Error;

/// Errors returned by the Data Plane API client.
#[derive(Error, Debug)]
pub enum HaproxyError {
    /// A remote object exists under the requested name but does not carry the
    /// managed description, so it belongs to someone else.
    #[error("{resource_type} \"{name}\" exists but is not managed by this operator")]
    NotManaged {
        /// Kind of HAProxy object (backend, frontend)
        resource_type: &'static str,
        /// Name of the object
        name: String,
    },

    /// The Data Plane API answered with a non-success status.
    #[error("failed to {operation}, status: {status}, body: {body}")]
    ApiResponse {
        /// Operation that was attempted (e.g. "create backend")
        operation: String,
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Opening a transaction was rejected because too many are already open (HTTP 409).
    #[error("too many open transactions on the Data Plane API")]
    TransactionConflict,

    /// Commit was rejected with 400, 404 or 406.
    #[error("commit of transaction {id} rejected with status {status}: {reason}")]
    CommitRejected {
        /// Transaction id
        id: String,
        /// HTTP status code (400, 404 or 406)
        status: u16,
        /// Short description of the status
        reason: &'static str,
    },

    /// Discard targeted a transaction the remote side no longer knows (HTTP 404).
    #[error("transaction {id} not found")]
    TransactionNotFound {
        /// Transaction id
        id: String,
    },

    /// A transaction is already open on this session.
    #[error("transaction {id} is already open")]
    TransactionAlreadyOpen {
        /// Transaction id
        id: String,
    },

    /// Commit or discard was requested without an open transaction.
    #[error("no transaction is open")]
    NoOpenTransaction,

    /// The configuration version body was neither an integer nor `{"_version": n}`.
    #[error("failed to parse configuration version from body {body:?}")]
    VersionParse {
        /// Body as received
        body: String,
    },

    /// The request could not be sent or timed out.
    #[error("request to {url} failed: {source}")]
    Transport {
        /// Target URL
        url: String,
        /// Underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// A success response could not be decoded.
    #[error("failed to decode {what} response: {source}")]
    Decode {
        /// What was being decoded
        what: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The configured base URL, or a URL derived from it, is invalid.
    #[error("invalid Data Plane API URL {url}: {source}")]
    InvalidUrl {
        /// Offending URL
        url: String,
        /// Underlying parse error
        #[source]
        source: url::ParseError,
    },
}

impl HaproxyError {
    /// Metric label for the failure category.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotManaged { .. } => "not_managed",
            Self::ApiResponse { .. } => "api_response",
            Self::TransactionConflict => "transaction_conflict",
            Self::CommitRejected { .. } => "commit_rejected",
            Self::TransactionNotFound { .. } => "transaction_not_found",
            Self::TransactionAlreadyOpen { .. } | Self::NoOpenTransaction => "transaction_state",
            Self::VersionParse { .. } => "version_parse",
            Self::Transport { .. } => "transport",
            Self::Decode { .. } => "decode",
            Self::InvalidUrl { .. } => "invalid_url",
        }
    }

    /// Condition reason for this error.
    #[must_use]
    pub fn status_reason(&self) -> &'static str {
        match self {
            Self::NotManaged { .. } => REASON_NOT_MANAGED,
            Self::TransactionConflict => REASON_TRANSACTION_CONFLICT,
            Self::ApiResponse { status, .. } | Self::CommitRejected { status, .. } => {
                map_http_error_to_reason(*status).0
            }
            Self::Transport { .. } => map_connection_error().0,
            _ => REASON_HAPROXY_CLIENT_ERROR,
        }
    }

    /// Message for the `Backend` condition and events.
    ///
    /// Transaction ids, versions and raw response bodies are left out so that
    /// repeated identical failures produce an identical message. They are logged
    /// where the error is raised.
    #[must_use]
    pub fn condition_message(&self) -> String {
        match self {
            Self::ApiResponse {
                operation, status, ..
            } => format!(
                "failed to {operation}: {}",
                map_http_error_to_reason(*status).1
            ),
            Self::CommitRejected { status, reason, .. } => {
                format!("commit rejected with status {status}: {reason}")
            }
            Self::TransactionNotFound { .. } => {
                "transaction not found on the Data Plane API".to_string()
            }
            Self::TransactionAlreadyOpen { .. } => {
                "a transaction is already open on this session".to_string()
            }
            Self::Transport { .. } => map_connection_error().1,
            _ => self.to_string(),
        }
    }
}

/// Errors that abort a `Backend` reconcile pass.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The desired state is malformed.
    #[error("invalid Backend spec: {0}")]
    Validation(String),

    /// A referenced `Service` does not exist.
    #[error("referenced Service {namespace}/{name} not found")]
    ServiceNotFound {
        /// Service namespace
        namespace: String,
        /// Service name
        name: String,
    },

    /// A referenced `Service` has no `EndpointSlices`.
    #[error("no EndpointSlices found for Service {namespace}/{name}")]
    EndpointsNotFound {
        /// Service namespace
        namespace: String,
        /// Service name
        name: String,
    },

    /// Every endpoint of a referenced `Service` was skipped.
    #[error("Service {namespace}/{name} has no usable endpoints")]
    NoUsableEndpoints {
        /// Service namespace
        namespace: String,
        /// Service name
        name: String,
    },

    /// Looking up membership for a referenced `Service` failed.
    #[error("failed to look up {what}: {source}")]
    MembershipLookup {
        /// What was being looked up
        what: String,
        /// Underlying error
        #[source]
        source: anyhow::Error,
    },

    /// The Data Plane API call failed.
    #[error(transparent)]
    Haproxy(#[from] HaproxyError),

    /// Attaching the finalizer failed.
    #[error("failed to add finalizer: {0}")]
    AddFinalizer(#[source] anyhow::Error),

    /// Detaching the finalizer after a successful teardown failed.
    #[error("failed to remove finalizer: {0}")]
    RemoveFinalizer(#[source] anyhow::Error),

    /// Any other Kubernetes API failure (status patch, fetch).
    #[error("Kubernetes API call failed: {0}")]
    Kubernetes(#[source] anyhow::Error),
}

impl BackendError {
    /// Condition reason for this error.
    #[must_use]
    pub fn status_reason(&self) -> &'static str {
        match self {
            Self::Validation(_) => REASON_VALIDATION_ERROR,
            Self::ServiceNotFound { .. } => REASON_SERVICE_NOT_FOUND,
            Self::EndpointsNotFound { .. } => REASON_ENDPOINTS_NOT_FOUND,
            Self::NoUsableEndpoints { .. } => REASON_NO_USABLE_ENDPOINTS,
            Self::MembershipLookup { .. } => REASON_ENDPOINTS_LIST_ERROR,
            Self::Haproxy(err) => err.status_reason(),
            Self::AddFinalizer(_) => REASON_ADD_FINALIZER_FAILED,
            Self::RemoveFinalizer(_) => REASON_REMOVE_FINALIZER_FAILED,
            Self::Kubernetes(_) => REASON_KUBERNETES_API_ERROR,
        }
    }

    /// Metric label for the failure category.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::ServiceNotFound { .. }
            | Self::EndpointsNotFound { .. }
            | Self::NoUsableEndpoints { .. }
            | Self::MembershipLookup { .. } => "membership",
            Self::Haproxy(err) => err.category(),
            Self::AddFinalizer(_) | Self::RemoveFinalizer(_) | Self::Kubernetes(_) => {
                "kubernetes"
            }
        }
    }

    /// Returns true if the error can only be resolved by a change to the resource
    /// or by an operator fixing the remote side.
    #[must_use]
    pub fn needs_intervention(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Haproxy(HaproxyError::NotManaged { .. })
        )
    }

    /// Message for the `Backend` condition and events. Stable across passes that
    /// fail the same way.
    #[must_use]
    pub fn condition_message(&self) -> String {
        match self {
            Self::Haproxy(err) => err.condition_message(),
            _ => self.to_string(),
        }
    }

    /// Returns true if the remote side rejected a new transaction.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Haproxy(HaproxyError::TransactionConflict))
    }
}
