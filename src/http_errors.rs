// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP error code mapping to Kubernetes status condition reasons.
//!
//! This module maps HTTP status codes returned by the HAProxy Data Plane API
//! to standardized condition reasons, so a failed write surfaces on the
//! `Backend` status with a reason an operator can act on.
//!
//! # Usage
//!
//! ```rust
//! use haproxy_operator::http_errors::map_http_error_to_reason;
//!
//! let (reason, message) = map_http_error_to_reason(406);
//! assert_eq!(reason, "DataPlaneNotAcceptable");
//!
//! let (reason, message) = map_http_error_to_reason(503);
//! assert_eq!(reason, "GatewayError");
//! ```

use crate::status_reasons::{
    REASON_DATAPLANE_AUTH_FAILED, REASON_DATAPLANE_BAD_REQUEST, REASON_DATAPLANE_INTERNAL_ERROR,
    REASON_DATAPLANE_NOT_ACCEPTABLE, REASON_DATAPLANE_NOT_FOUND, REASON_DATAPLANE_UNREACHABLE,
    REASON_GATEWAY_ERROR, REASON_TRANSACTION_CONFLICT,
};

/// Map HTTP status code to condition reason and message.
///
/// # HTTP Code Mapping
///
/// | HTTP Code | Reason | Meaning |
/// |-----------|--------|---------|
/// | 400 | `DataPlaneBadRequest` | Invalid request or configuration |
/// | 401 | `DataPlaneAuthFailed` | Authentication required |
/// | 403 | `DataPlaneAuthFailed` | Insufficient permissions |
/// | 404 | `DataPlaneNotFound` | Object or transaction not found |
/// | 406 | `DataPlaneNotAcceptable` | Configuration cannot be applied |
/// | 409 | `TransactionConflict` | Too many open transactions |
/// | 500 | `DataPlaneInternalError` | Internal server error |
/// | 502 | `GatewayError` | Bad gateway |
/// | 503 | `GatewayError` | Service unavailable |
/// | 504 | `GatewayError` | Gateway timeout |
/// | Other | `DataPlaneUnreachable` | Unexpected error |
#[must_use]
pub fn map_http_error_to_reason(status_code: u16) -> (&'static str, String) {
    match status_code {
        400 => (
            REASON_DATAPLANE_BAD_REQUEST,
            "Invalid request to Data Plane API (400)".into(),
        ),
        401 => (
            REASON_DATAPLANE_AUTH_FAILED,
            "Data Plane API authentication required (401)".into(),
        ),
        403 => (
            REASON_DATAPLANE_AUTH_FAILED,
            "Data Plane API authorization failed (403)".into(),
        ),
        404 => (
            REASON_DATAPLANE_NOT_FOUND,
            "Object or transaction not found in HAProxy (404)".into(),
        ),
        406 => (
            REASON_DATAPLANE_NOT_ACCEPTABLE,
            "HAProxy cannot apply the configuration (406)".into(),
        ),
        409 => (
            REASON_TRANSACTION_CONFLICT,
            "Too many open transactions on the Data Plane API (409)".into(),
        ),
        500 => (
            REASON_DATAPLANE_INTERNAL_ERROR,
            "Data Plane API internal error (500)".into(),
        ),
        502 => (
            REASON_GATEWAY_ERROR,
            "Bad gateway reaching the Data Plane API (502)".into(),
        ),
        503 => (
            REASON_GATEWAY_ERROR,
            "Data Plane API unavailable (503)".into(),
        ),
        504 => (
            REASON_GATEWAY_ERROR,
            "Gateway timeout reaching the Data Plane API (504)".into(),
        ),
        _ => (
            REASON_DATAPLANE_UNREACHABLE,
            format!("Unexpected HTTP error from the Data Plane API ({status_code})"),
        ),
    }
}

/// Map a connection failure (no HTTP status received) to a condition reason and message.
#[must_use]
pub fn map_connection_error() -> (&'static str, String) {
    (
        REASON_DATAPLANE_UNREACHABLE,
        "Cannot connect to the Data Plane API (network error or timeout)".into(),
    )
}
