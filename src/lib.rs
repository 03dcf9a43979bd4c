// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # HAProxy Operator for Kubernetes
//!
//! A Kubernetes operator that keeps HAProxy backends, their `http-check` steps and
//! their servers converged with `Backend` custom resources through the HAProxy
//! Data Plane API.
//!
//! ## Overview
//!
//! - Servers are either declared statically or resolved from the ready endpoints
//!   of a Kubernetes `Service`
//! - Every change is applied in a Data Plane API transaction that is committed
//!   only if something was written, and discarded otherwise
//! - Objects created by the operator carry a managed description; anything else
//!   found on HAProxy is never modified or deleted
//! - A finalizer removes the HAProxy backend before the `Backend` goes away
//!
//! ## Modules
//!
//! - [`crd`] - The `Backend` custom resource
//! - [`model`] - Desired and resolved backend models
//! - [`haproxy`] - Data Plane API client and synchronization
//! - [`reconcilers`] - Validation, resolution and the reconcile pass
//! - [`controller`] - Controller wiring and requeue policy
//! - [`context`] - Shared context handed to every reconcile
//! - [`config`] - Command-line and environment configuration
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust
//! use haproxy_operator::crd::{Balance, BalanceAlgorithm, BackendSpec, ServerSpec};
//! use haproxy_operator::reconcilers::backend::validation::validate_backend;
//!
//! let spec = BackendSpec {
//!     name: "web".to_string(),
//!     mode: None,
//!     balance: Some(Balance { algorithm: BalanceAlgorithm::RoundRobin }),
//!     adv_check: None,
//!     servers: vec![ServerSpec {
//!         name: Some("s1".to_string()),
//!         address: Some("10.0.0.1".to_string()),
//!         port: Some(8080),
//!         ..Default::default()
//!     }],
//!     http_check_list: vec![],
//! };
//!
//! let desired = validate_backend(&spec, "default").unwrap();
//! assert_eq!(desired.servers.len(), 1);
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod controller;
pub mod crd;
pub mod errors;
pub mod haproxy;
pub mod http_errors;
pub mod metrics;
pub mod model;
pub mod reconcilers;
pub mod status_reasons;
