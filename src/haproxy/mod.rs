// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HAProxy Data Plane API client.
//!
//! This module talks to the Data Plane API v3 over HTTP with basic authentication.
//! It is split into:
//!
//! - [`transaction`] - configuration version parsing and the [`ConfigSession`]
//!   that scopes writes to a transaction (open, commit, discard)
//! - [`backend`] - backend CRUD and the full backend synchronization entry point
//! - [`http_check`] - replace-whole-list synchronization of `http-check` steps
//! - [`server`] - server CRUD and set reconciliation
//! - [`frontend`] - frontends, binds and backend switching rules
//! - [`types`] - wire models
//!
//! Every object this client creates is stamped with
//! [`MANAGED_DESCRIPTION`](crate::constants::MANAGED_DESCRIPTION). Objects that exist
//! with a different description are never modified.
//!
//! # Example
//!
//! ```rust,no_run
//! use haproxy_operator::haproxy::{HaproxyClient, HaproxyConfig};
//! use haproxy_operator::metrics::NoopMetrics;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), haproxy_operator::errors::HaproxyError> {
//! let config = HaproxyConfig::new("http://haproxy:5555", "admin", "secret");
//! let client = HaproxyClient::new(config, Arc::new(NoopMetrics))?;
//!
//! let mut session = client.session();
//! session.open().await?;
//! session.delete_backend("legacy").await?;
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod frontend;
pub mod http_check;
pub mod server;
pub mod transaction;
pub mod types;

pub use transaction::{parse_config_version, CloseOutcome, ConfigSession};

use crate::constants::{DATAPLANE_CONFIGURATION_PATH, DEFAULT_API_TIMEOUT_SECS};
use crate::errors::HaproxyError;
use crate::metrics::MetricsSink;
use reqwest::header::ACCEPT;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

/// Connection settings for the Data Plane API.
#[derive(Clone, Debug)]
pub struct HaproxyConfig {
    /// Base URL, e.g. `http://haproxy:5555`
    pub base_url: String,
    /// Basic-auth user
    pub username: String,
    /// Basic-auth password
    pub password: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Send `force_reload=true` on commit
    pub force_reload: bool,
}

impl HaproxyConfig {
    /// Create a config with the default timeout and no forced reload.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
            force_reload: false,
        }
    }
}

/// Outcome of a single synchronization step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Change {
    Created,
    Updated,
    Deleted,
    #[default]
    Unchanged,
}

impl Change {
    /// Returns true if a write was issued.
    #[must_use]
    pub fn is_write(self) -> bool {
        self != Self::Unchanged
    }
}

/// Server names touched by a server-set synchronization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerSyncReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
}

impl ServerSyncReport {
    /// Returns true if any server was written.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !(self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty())
    }
}

/// Everything a backend synchronization changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub backend: Change,
    pub http_checks: Change,
    pub servers: ServerSyncReport,
}

impl SyncReport {
    /// Returns true if any write was issued.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.backend.is_write() || self.http_checks.is_write() || self.servers.has_changes()
    }

    /// One-line human-readable summary, used in events.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "backend {:?}, http checks {:?}, servers created {}, updated {}, deleted {}",
            self.backend,
            self.http_checks,
            self.servers.created.len(),
            self.servers.updated.len(),
            self.servers.deleted.len()
        )
    }
}

/// Raw response of a Data Plane API call.
#[derive(Clone, Debug)]
pub(crate) struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// Data Plane API client. Cheap to clone.
#[derive(Clone)]
pub struct HaproxyClient {
    http: reqwest::Client,
    config: Arc<HaproxyConfig>,
    base_url: Url,
    metrics: Arc<dyn MetricsSink>,
}

impl std::fmt::Debug for HaproxyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HaproxyClient")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.config.username)
            .field("timeout", &self.config.timeout)
            .finish_non_exhaustive()
    }
}

impl HaproxyClient {
    /// Build a client for the given Data Plane API.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: HaproxyConfig, metrics: Arc<dyn MetricsSink>) -> Result<Self, HaproxyError> {
        let base = build_api_url(&config.base_url);
        let base_url = Url::parse(&base).map_err(|source| HaproxyError::InvalidUrl {
            url: base.clone(),
            source,
        })?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| HaproxyError::Transport { url: base, source })?;

        Ok(Self {
            http,
            config: Arc::new(config),
            base_url,
            metrics,
        })
    }

    /// Start a new session without an open transaction.
    #[must_use]
    pub fn session(&self) -> ConfigSession {
        ConfigSession::new(self.clone())
    }

    /// Connection settings this client was built with.
    #[must_use]
    pub fn config(&self) -> &HaproxyConfig {
        &self.config
    }

    pub(crate) fn metrics(&self) -> &dyn MetricsSink {
        self.metrics.as_ref()
    }

    /// Read the current configuration version.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is neither an integer nor
    /// a JSON object with a `_version` field.
    pub async fn get_config_version(&self) -> Result<i64, HaproxyError> {
        let url = self.endpoint(DATAPLANE_CONFIGURATION_PATH, &["version"], &[])?;
        let response = self.request(Method::GET, url, None::<&()>).await?;
        if !response.is_success() {
            return Err(self.api_error("get configuration version", response));
        }
        parse_config_version(&response.body).map_err(|e| self.fail(e))
    }

    /// Build an absolute URL for the fixed API `path`, followed by `segments` and
    /// the given query parameters.
    ///
    /// Segments are object names and are percent-encoded, so a `/`, `?` or `#`
    /// in a name stays inside its segment.
    pub(crate) fn endpoint(
        &self,
        path: &str,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<Url, HaproxyError> {
        let raw = format!("{}{path}", self.base_url.as_str().trim_end_matches('/'));
        let invalid = |source: url::ParseError| {
            self.fail(HaproxyError::InvalidUrl {
                url: raw.clone(),
                source,
            })
        };
        let mut url = Url::parse(&raw).map_err(&invalid)?;
        if !segments.is_empty() {
            url.path_segments_mut()
                .map_err(|()| invalid(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
                .pop_if_empty()
                .extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Send one request. Non-success statuses are returned, not turned into errors,
    /// because several endpoints give 404 or 409 a specific meaning.
    pub(crate) async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<ApiResponse, HaproxyError> {
        debug!(method = %method, url = %url, "Data Plane API request");

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header(ACCEPT, "application/json");
        if let Some(body_data) = body {
            request = request.json(body_data);
        }

        let response = request
            .send()
            .await
            .map_err(|source| self.transport_error(&method, &url, source))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|source| self.transport_error(&method, &url, source))?;

        debug!(
            method = %method,
            url = %url,
            status = status,
            response_len = body.len(),
            "Data Plane API response"
        );

        Ok(ApiResponse { status, body })
    }

    /// Decode a JSON success body.
    pub(crate) fn decode<T: DeserializeOwned>(
        &self,
        what: &str,
        response: &ApiResponse,
    ) -> Result<T, HaproxyError> {
        serde_json::from_str(&response.body).map_err(|source| {
            self.fail(HaproxyError::Decode {
                what: what.to_string(),
                source,
            })
        })
    }

    /// Turn a non-success response into an [`HaproxyError::ApiResponse`].
    pub(crate) fn api_error(&self, operation: &str, response: ApiResponse) -> HaproxyError {
        error!(
            operation = %operation,
            status = response.status,
            error = %response.body,
            "Data Plane API request failed"
        );
        self.fail(HaproxyError::ApiResponse {
            operation: operation.to_string(),
            status: response.status,
            body: response.body,
        })
    }

    /// Turn a failed send into an [`HaproxyError::Transport`] whose URL carries no
    /// query, so transaction ids and versions stay in the log only.
    fn transport_error(&self, method: &Method, url: &Url, source: reqwest::Error) -> HaproxyError {
        error!(method = %method, url = %url, error = %source, "Data Plane API request failed");
        let mut path_only = url.clone();
        path_only.set_query(None);
        self.fail(HaproxyError::Transport {
            url: path_only.to_string(),
            source: source.without_url(),
        })
    }

    /// Count the error against its category and hand it back.
    pub(crate) fn fail(&self, err: HaproxyError) -> HaproxyError {
        self.metrics.client_error(err.category());
        err
    }
}

/// Normalize a Data Plane API address into a base URL.
///
/// Converts "haproxy.lb.svc:5555" to `<http://haproxy.lb.svc:5555>` and strips a
/// trailing slash.
pub(crate) fn build_api_url(server: &str) -> String {
    if server.starts_with("http://") || server.starts_with("https://") {
        server.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", server.trim_end_matches('/'))
    }
}

#[cfg(test)]
pub(crate) mod test_support;

#[cfg(test)]
mod frontend_tests;
#[cfg(test)]
mod mod_tests;
#[cfg(test)]
mod server_tests;
