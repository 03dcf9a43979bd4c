// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation for `Backend` resources.
//!
//! # Reconciliation Architecture
//!
//! The operator follows the standard Kubernetes controller pattern:
//!
//! 1. **Watch** - `Backend` changes, plus changes to referenced Services and their
//!    `EndpointSlices` through the [`index`]
//! 2. **Resolve** - expand Service references into concrete servers
//! 3. **Synchronize** - converge HAProxy inside a Data Plane API transaction
//! 4. **Status** - report the outcome as a condition and an event
//!
//! # Modules
//!
//! - [`backend`] - the reconcile pass, validation, resolution and the Kubernetes store
//! - [`finalizers`] - finalizer add/remove
//! - [`status`] - conditions and events
//! - [`index`] - Service → Backend re-trigger index

pub mod backend;
pub mod finalizers;
pub mod index;
pub mod status;

pub use backend::{reconcile_backend, ReconcileOutcome};
