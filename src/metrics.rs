// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the HAProxy operator.
//!
//! Metrics are recorded through the [`MetricsSink`] trait, which is handed to the
//! Data Plane API client and the reconciler at construction time. [`OperatorMetrics`]
//! is the Prometheus-backed implementation and owns its own [`Registry`], so tests
//! and multiple operator instances never share counters.
//!
//! All metric names carry the prefix `haproxy_operator_`.
//!
//! # Example
//!
//! ```rust
//! use haproxy_operator::metrics::{MetricsSink, OperatorMetrics};
//!
//! let metrics = OperatorMetrics::new().unwrap();
//! metrics.client_error("transport");
//! assert!(metrics.gather().unwrap().contains("haproxy_operator_client_errors_total"));
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all operator metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "haproxy_operator";

// ============================================================================
// Sink
// ============================================================================

/// Observability collaborator injected into the client and the reconciler.
pub trait MetricsSink: Send + Sync {
    /// A Data Plane API call failed with the given category.
    fn client_error(&self, category: &str);

    /// A write was issued against the Data Plane API.
    fn remote_write(&self, resource: &str, operation: &str);

    /// A reconcile pass finished.
    fn reconciliation(&self, outcome: &str, duration: Duration);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn client_error(&self, _category: &str) {}

    fn remote_write(&self, _resource: &str, _operation: &str) {}

    fn reconciliation(&self, _outcome: &str, _duration: Duration) {}
}

// ============================================================================
// Prometheus Implementation
// ============================================================================

/// Prometheus-backed [`MetricsSink`].
#[derive(Clone)]
pub struct OperatorMetrics {
    registry: Registry,
    client_errors: CounterVec,
    remote_writes: CounterVec,
    reconciliations: CounterVec,
    reconciliation_duration: HistogramVec,
}

impl OperatorMetrics {
    /// Create all metrics and register them in a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric definition is invalid or registered twice.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Labels:
        // - `category`: failure category (e.g. `transport`, `not_managed`)
        let client_errors = CounterVec::new(
            Opts::new(
                format!("{METRICS_NAMESPACE}_client_errors_total"),
                "Total number of Data Plane API client errors by category",
            ),
            &["category"],
        )?;
        registry.register(Box::new(client_errors.clone()))?;

        // Labels:
        // - `resource`: HAProxy object kind (`backend`, `server`, `http_checks`, ...)
        // - `operation`: `create`, `update`, `delete`, `commit`, `discard`
        let remote_writes = CounterVec::new(
            Opts::new(
                format!("{METRICS_NAMESPACE}_remote_writes_total"),
                "Total number of writes issued to the Data Plane API",
            ),
            &["resource", "operation"],
        )?;
        registry.register(Box::new(remote_writes.clone()))?;

        let reconciliations = CounterVec::new(
            Opts::new(
                format!("{METRICS_NAMESPACE}_reconciliations_total"),
                "Total number of Backend reconciliations by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(reconciliations.clone()))?;

        let reconciliation_duration = HistogramVec::new(
            HistogramOpts::new(
                format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
                "Duration of Backend reconciliations in seconds",
            )
            .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
            &["outcome"],
        )?;
        registry.register(Box::new(reconciliation_duration.clone()))?;

        Ok(Self {
            registry,
            client_errors,
            remote_writes,
            reconciliations,
            reconciliation_duration,
        })
    }

    /// Gather all metrics in Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
    }
}

impl MetricsSink for OperatorMetrics {
    fn client_error(&self, category: &str) {
        self.client_errors.with_label_values(&[category]).inc();
    }

    fn remote_write(&self, resource: &str, operation: &str) {
        self.remote_writes
            .with_label_values(&[resource, operation])
            .inc();
    }

    fn reconciliation(&self, outcome: &str, duration: Duration) {
        self.reconciliations.with_label_values(&[outcome]).inc();
        self.reconciliation_duration
            .with_label_values(&[outcome])
            .observe(duration.as_secs_f64());
    }
}
