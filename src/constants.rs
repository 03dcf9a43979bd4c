// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the HAProxy operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for all HAProxy operator CRDs
pub const API_GROUP: &str = "haproxy.firestoned.io";

/// API version for all HAProxy operator CRDs
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "haproxy.firestoned.io/v1alpha1";

/// Kind name for `Backend` resource
pub const KIND_BACKEND: &str = "Backend";

/// Finalizer that blocks deletion of a `Backend` until its HAProxy backend is torn down
pub const BACKEND_FINALIZER: &str = "haproxy.firestoned.io/finalizer";

// ============================================================================
// Ownership
// ============================================================================

/// Description stamped onto every HAProxy object this operator creates.
///
/// Objects whose description differs are treated as hand-configured and are
/// never updated or deleted.
pub const MANAGED_DESCRIPTION: &str = "Managed by haproxy-operator";

// ============================================================================
// Data Plane API Constants
// ============================================================================

/// Prefix for configuration endpoints of the Data Plane API v3
pub const DATAPLANE_CONFIGURATION_PATH: &str = "/v3/services/haproxy/configuration";

/// Transactions endpoint of the Data Plane API v3
pub const DATAPLANE_TRANSACTIONS_PATH: &str = "/v3/services/haproxy/transactions";

/// Query parameter scoping a write to an open transaction
pub const QUERY_TRANSACTION_ID: &str = "transaction_id";

/// Query parameter scoping a request to a configuration version
pub const QUERY_VERSION: &str = "version";

/// Query parameter forcing a reload on commit
pub const QUERY_FORCE_RELOAD: &str = "force_reload";

/// Default per-request timeout for Data Plane API calls
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Kubernetes Discovery Constants
// ============================================================================

/// Label linking an `EndpointSlice` to its owning `Service`
pub const SERVICE_NAME_LABEL: &str = "kubernetes.io/service-name";

/// Kind of endpoint target refs that are subject to the liveness filter
pub const KIND_POD: &str = "Pod";

/// Pod phase required for an endpoint to be usable
pub const POD_PHASE_RUNNING: &str = "Running";

/// Pod condition type reporting readiness
pub const POD_CONDITION_READY: &str = "Ready";

// ============================================================================
// Kubernetes Condition Status Values
// ============================================================================

/// Condition status when the observed state matches the desired state
pub const CONDITION_STATUS_TRUE: &str = "True";

/// Condition status when reconciliation failed
pub const CONDITION_STATUS_FALSE: &str = "False";

// ============================================================================
// Controller Timing Constants
// ============================================================================

/// Requeue duration for error conditions (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue duration after a transaction conflict on the Data Plane API
pub const CONFLICT_REQUEUE_DURATION_SECS: u64 = 5;

/// Periodic resync after a successful reconciliation, catches drift on the HAProxy side
pub const SUCCESS_REQUEUE_DURATION_SECS: u64 = 300;

/// Number of worker threads in the Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Default bind address for the metrics and health HTTP server
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Path for the Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the liveness endpoint
pub const HEALTH_SERVER_PATH: &str = "/healthz";
