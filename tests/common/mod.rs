// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Stateful fake of the HAProxy Data Plane API for integration tests.
//!
//! Writes scoped by `transaction_id` are staged on a copy of the configuration and
//! only become visible once the transaction is committed. Writes scoped by
//! `version` apply directly.

#![allow(dead_code)]

use haproxy_operator::haproxy::{HaproxyClient, HaproxyConfig};
use haproxy_operator::metrics::NoopMetrics;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const CONFIG: &str = "/v3/services/haproxy/configuration";
pub const TRANSACTIONS: &str = "/v3/services/haproxy/transactions";

/// One HAProxy configuration.
#[derive(Clone, Debug, Default)]
pub struct Config {
    pub backends: BTreeMap<String, Value>,
    pub servers: BTreeMap<String, Vec<Value>>,
    pub http_checks: BTreeMap<String, Value>,
}

impl Config {
    pub fn server_names(&self, backend: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .servers
            .get(backend)
            .into_iter()
            .flatten()
            .filter_map(|s| s["name"].as_str().map(str::to_string))
            .collect();
        names.sort();
        names
    }
}

#[derive(Debug, Default)]
struct State {
    version: i64,
    committed: Config,
    transactions: HashMap<String, Config>,
    next_transaction: u32,
    max_transactions: usize,
    writes: Vec<String>,
}

/// Fake Data Plane API. Cheap to clone, all clones share state.
#[derive(Clone, Debug)]
pub struct FakeDataplane {
    state: Arc<Mutex<State>>,
}

impl FakeDataplane {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                version: 1,
                max_transactions: 20,
                ..Default::default()
            })),
        }
    }

    /// Start a mock server answering every request with this fake.
    pub async fn start(&self) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(self.clone())
            .mount(&server)
            .await;
        server
    }

    /// Add a committed backend as if someone configured it by hand.
    pub fn seed_backend(&self, name: &str, description: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        let mut backend = json!({ "name": name });
        if let Some(description) = description {
            backend["description"] = json!(description);
        }
        state.committed.backends.insert(name.to_string(), backend);
        state.committed.servers.insert(name.to_string(), vec![]);
    }

    /// Add a committed server to an existing backend.
    pub fn seed_server(&self, backend: &str, server: Value) {
        let mut state = self.state.lock().unwrap();
        state
            .committed
            .servers
            .entry(backend.to_string())
            .or_default()
            .push(server);
    }

    pub fn set_max_transactions(&self, max: usize) {
        self.state.lock().unwrap().max_transactions = max;
    }

    /// The committed configuration.
    pub fn committed(&self) -> Config {
        self.state.lock().unwrap().committed.clone()
    }

    pub fn version(&self) -> i64 {
        self.state.lock().unwrap().version
    }

    pub fn open_transactions(&self) -> usize {
        self.state.lock().unwrap().transactions.len()
    }

    /// Every non-GET request as `METHOD path`.
    pub fn writes(&self) -> Vec<String> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.lock().unwrap().writes.clear();
    }
}

pub fn client_for(server: &MockServer) -> HaproxyClient {
    HaproxyClient::new(
        HaproxyConfig::new(server.uri(), "admin", "secret"),
        Arc::new(NoopMetrics),
    )
    .unwrap()
}

fn query(request: &Request, key: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({"code": 404, "message": "not found"}))
}

impl State {
    fn handle_transactions(&mut self, request: &Request, rest: &[&str]) -> ResponseTemplate {
        match (request.method.as_str(), rest) {
            ("POST", []) => {
                if self.transactions.len() >= self.max_transactions {
                    return ResponseTemplate::new(409)
                        .set_body_json(json!({"code": 409, "message": "too many open transactions"}));
                }
                let version = query(request, "version").and_then(|v| v.parse::<i64>().ok());
                if version != Some(self.version) {
                    return ResponseTemplate::new(409)
                        .set_body_json(json!({"code": 409, "message": "version mismatch"}));
                }
                self.next_transaction += 1;
                let id = format!("tx-{}", self.next_transaction);
                self.transactions.insert(id.clone(), self.committed.clone());
                ResponseTemplate::new(201).set_body_json(
                    json!({"id": id, "_version": self.version, "status": "in_progress"}),
                )
            }
            ("PUT", [id]) => match self.transactions.remove(*id) {
                Some(staged) => {
                    self.committed = staged;
                    self.version += 1;
                    ResponseTemplate::new(202).set_body_json(
                        json!({"id": id, "_version": self.version, "status": "success"}),
                    )
                }
                None => not_found(),
            },
            ("DELETE", [id]) => match self.transactions.remove(*id) {
                Some(_) => ResponseTemplate::new(204),
                None => not_found(),
            },
            _ => ResponseTemplate::new(405),
        }
    }

    fn handle_configuration(&mut self, request: &Request, rest: &[&str]) -> ResponseTemplate {
        if request.method.as_str() == "GET" && rest == ["version"] {
            return ResponseTemplate::new(200).set_body_string(self.version.to_string());
        }

        let version = self.version;
        let config = match query(request, "transaction_id") {
            Some(id) => match self.transactions.get_mut(&id) {
                Some(staged) => staged,
                None => return not_found(),
            },
            None => {
                if request.method.as_str() != "GET"
                    && query(request, "version").and_then(|v| v.parse::<i64>().ok())
                        != Some(version)
                {
                    return ResponseTemplate::new(409)
                        .set_body_json(json!({"code": 409, "message": "version mismatch"}));
                }
                &mut self.committed
            }
        };
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);

        match (request.method.as_str(), rest) {
            ("GET", ["backends"]) => {
                ResponseTemplate::new(200).set_body_json(config.backends.values().collect::<Vec<_>>())
            }
            ("POST", ["backends"]) => {
                let name = body["name"].as_str().unwrap_or_default().to_string();
                if config.backends.contains_key(&name) {
                    return ResponseTemplate::new(409);
                }
                config.backends.insert(name.clone(), body.clone());
                config.servers.insert(name, vec![]);
                ResponseTemplate::new(201).set_body_json(body)
            }
            ("GET", ["backends", name]) => match config.backends.get(*name) {
                Some(backend) => ResponseTemplate::new(200).set_body_json(backend),
                None => not_found(),
            },
            ("PUT", ["backends", name]) => match config.backends.get_mut(*name) {
                Some(backend) => {
                    *backend = body.clone();
                    ResponseTemplate::new(200).set_body_json(body)
                }
                None => not_found(),
            },
            ("DELETE", ["backends", name]) => {
                if config.backends.remove(*name).is_none() {
                    return not_found();
                }
                config.servers.remove(*name);
                config.http_checks.remove(*name);
                ResponseTemplate::new(204)
            }
            ("GET", ["backends", name, "http_checks"]) => {
                if !config.backends.contains_key(*name) {
                    return not_found();
                }
                let checks = config.http_checks.get(*name).cloned().unwrap_or(json!([]));
                ResponseTemplate::new(200).set_body_json(checks)
            }
            ("PUT", ["backends", name, "http_checks"]) => {
                if !config.backends.contains_key(*name) {
                    return not_found();
                }
                config.http_checks.insert((*name).to_string(), body.clone());
                ResponseTemplate::new(202).set_body_json(body)
            }
            ("GET", ["backends", name, "servers"]) => match config.servers.get(*name) {
                Some(servers) => ResponseTemplate::new(200).set_body_json(servers),
                None => not_found(),
            },
            ("POST", ["backends", name, "servers"]) => match config.servers.get_mut(*name) {
                Some(servers) => {
                    servers.push(body.clone());
                    ResponseTemplate::new(201).set_body_json(body)
                }
                None => not_found(),
            },
            ("GET", ["backends", name, "servers", server]) => config
                .servers
                .get(*name)
                .and_then(|servers| servers.iter().find(|s| s["name"] == *server))
                .map_or_else(not_found, |s| ResponseTemplate::new(200).set_body_json(s)),
            ("PUT", ["backends", name, "servers", server]) => {
                let Some(slot) = config
                    .servers
                    .get_mut(*name)
                    .and_then(|servers| servers.iter_mut().find(|s| s["name"] == *server))
                else {
                    return not_found();
                };
                *slot = body.clone();
                ResponseTemplate::new(200).set_body_json(body)
            }
            ("DELETE", ["backends", name, "servers", server]) => {
                let Some(servers) = config.servers.get_mut(*name) else {
                    return not_found();
                };
                let before = servers.len();
                servers.retain(|s| s["name"] != *server);
                if servers.len() == before {
                    not_found()
                } else {
                    ResponseTemplate::new(204)
                }
            }
            _ => ResponseTemplate::new(405),
        }
    }
}

impl Respond for FakeDataplane {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut state = self.state.lock().unwrap();
        let path = request.url.path().to_string();
        if request.method.as_str() != "GET" {
            state.writes.push(format!("{} {}", request.method, path));
        }

        let segments = |prefix: &str| -> Option<Vec<String>> {
            path.strip_prefix(prefix).map(|rest| {
                rest.split('/')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
        };

        if let Some(rest) = segments(TRANSACTIONS) {
            let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
            return state.handle_transactions(request, &rest);
        }
        if let Some(rest) = segments(CONFIG) {
            let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
            return state.handle_configuration(request, &rest);
        }
        not_found()
    }
}
