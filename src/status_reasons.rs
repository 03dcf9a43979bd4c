// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard Kubernetes status condition reasons for `Backend` resources.
//!
//! Reasons are programmatic identifiers in CamelCase that explain why a condition has
//! a particular status. Every reconcile pass upserts a single condition of type
//! [`CONDITION_TYPE_RECONCILING_COMPLETE`].
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   conditions:
//!     - type: ReconcilingComplete
//!       status: "False"
//!       reason: ServiceNotFound
//!       message: "Referenced Service default/web not found"
//! ```

// ============================================================================
// Condition Types
// ============================================================================

/// The only condition type reported on a `Backend`.
pub const CONDITION_TYPE_RECONCILING_COMPLETE: &str = "ReconcilingComplete";

// ============================================================================
// Success Reasons
// ============================================================================

/// The HAProxy backend, its HTTP checks and servers match the desired state.
pub const REASON_RECONCILE_COMPLETED: &str = "ReconcileCompleted";

/// Changes were committed to HAProxy during this pass (event reason).
pub const REASON_SYNCED: &str = "Synced";

/// Teardown succeeded and the finalizer was removed (event reason).
pub const REASON_FINALIZED: &str = "Finalized";

// ============================================================================
// Desired State Errors
// ============================================================================

/// The `Backend` spec is malformed and will not be retried until it changes.
pub const REASON_VALIDATION_ERROR: &str = "ValidationError";

/// A referenced `Service` does not exist.
pub const REASON_SERVICE_NOT_FOUND: &str = "ServiceNotFound";

/// Listing `EndpointSlices` or looking up members failed.
pub const REASON_ENDPOINTS_LIST_ERROR: &str = "EndpointsListError";

/// A referenced `Service` has no `EndpointSlices`.
pub const REASON_ENDPOINTS_NOT_FOUND: &str = "EndpointsNotFound";

/// Every endpoint of a referenced `Service` was filtered out.
pub const REASON_NO_USABLE_ENDPOINTS: &str = "NoUsableEndpoints";

// ============================================================================
// HAProxy Errors
// ============================================================================

/// Generic Data Plane API client failure.
pub const REASON_HAPROXY_CLIENT_ERROR: &str = "HAProxyClientError";

/// A remote object with the same name exists but is not owned by this operator.
pub const REASON_NOT_MANAGED: &str = "NotManaged";

/// The Data Plane API rejected a new transaction (too many open transactions).
pub const REASON_TRANSACTION_CONFLICT: &str = "TransactionConflict";

/// The Data Plane API rejected the request as malformed (HTTP 400).
pub const REASON_DATAPLANE_BAD_REQUEST: &str = "DataPlaneBadRequest";

/// Authentication or authorization against the Data Plane API failed (HTTP 401/403).
pub const REASON_DATAPLANE_AUTH_FAILED: &str = "DataPlaneAuthFailed";

/// The addressed object or transaction does not exist (HTTP 404).
pub const REASON_DATAPLANE_NOT_FOUND: &str = "DataPlaneNotFound";

/// The Data Plane API could not apply the request (HTTP 406).
pub const REASON_DATAPLANE_NOT_ACCEPTABLE: &str = "DataPlaneNotAcceptable";

/// The Data Plane API failed internally (HTTP 500).
pub const REASON_DATAPLANE_INTERNAL_ERROR: &str = "DataPlaneInternalError";

/// A gateway in front of the Data Plane API failed (HTTP 502/503/504).
pub const REASON_GATEWAY_ERROR: &str = "GatewayError";

/// Unexpected response from the Data Plane API.
pub const REASON_DATAPLANE_UNREACHABLE: &str = "DataPlaneUnreachable";

// ============================================================================
// Lifecycle Errors
// ============================================================================

/// Attaching the finalizer failed.
pub const REASON_ADD_FINALIZER_FAILED: &str = "AddFinalizerFailed";

/// Deleting the HAProxy backend during finalization failed.
pub const REASON_TEARDOWN_FAILED: &str = "TeardownFailed";

/// Detaching the finalizer after teardown failed.
pub const REASON_REMOVE_FINALIZER_FAILED: &str = "RemoveFinalizerFailed";

/// A Kubernetes API call made by the reconciler failed.
pub const REASON_KUBERNETES_API_ERROR: &str = "KubernetesApiError";
