// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared helpers for Data Plane API client tests.

use super::{HaproxyClient, HaproxyConfig};
use crate::metrics::MetricsSink;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CONFIG: &str = "/v3/services/haproxy/configuration";
pub const TRANSACTIONS: &str = "/v3/services/haproxy/transactions";

/// Sink that remembers every call.
#[derive(Default)]
pub struct RecordingMetrics {
    pub errors: Mutex<Vec<String>>,
    pub writes: Mutex<Vec<(String, String)>>,
}

impl RecordingMetrics {
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }
}

impl MetricsSink for RecordingMetrics {
    fn client_error(&self, category: &str) {
        self.errors.lock().unwrap().push(category.to_string());
    }

    fn remote_write(&self, resource: &str, operation: &str) {
        self.writes
            .lock()
            .unwrap()
            .push((resource.to_string(), operation.to_string()));
    }

    fn reconciliation(&self, _outcome: &str, _duration: Duration) {}
}

pub fn client_for(server: &MockServer) -> (HaproxyClient, Arc<RecordingMetrics>) {
    let metrics = Arc::new(RecordingMetrics::default());
    let config = HaproxyConfig::new(server.uri(), "admin", "secret");
    let client = HaproxyClient::new(config, metrics.clone()).unwrap();
    (client, metrics)
}

/// Serve configuration version `version` for any number of calls.
pub async fn mount_version(server: &MockServer, version: i64) {
    Mock::given(method("GET"))
        .and(path(format!("{CONFIG}/version")))
        .respond_with(ResponseTemplate::new(200).set_body_string(version.to_string()))
        .mount(server)
        .await;
}

/// Accept a transaction open and hand out id `tx-1`.
pub async fn mount_open_transaction(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TRANSACTIONS))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "tx-1",
            "_version": 7,
            "status": "in_progress"
        })))
        .mount(server)
        .await;
}
