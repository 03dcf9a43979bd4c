// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration.
//!
//! Every flag can also be set through the environment variable shown in `--help`.

use crate::constants::{DEFAULT_API_TIMEOUT_SECS, DEFAULT_METRICS_BIND_ADDRESS};
use crate::controller::WatchScope;
use crate::haproxy::HaproxyConfig;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Invalid operator configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid HAProxy API URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("HAProxy API timeout must be greater than zero")]
    ZeroTimeout,

    #[error("watch label {0:?} must have the form key=value")]
    InvalidWatchLabel(String),
}

#[derive(Parser, Clone)]
#[command(
    name = "haproxy-operator",
    version,
    about = "Kubernetes operator for the HAProxy Data Plane API"
)]
pub struct OperatorConfig {
    /// Data Plane API base URL, e.g. `http://haproxy:5555`.
    #[arg(long, env = "HAPROXY_API_URL")]
    pub haproxy_api_url: String,

    /// Data Plane API basic-auth user.
    #[arg(long, env = "HAPROXY_API_USER")]
    pub haproxy_api_user: String,

    /// Data Plane API basic-auth password.
    #[arg(long, env = "HAPROXY_API_PASS", hide_env_values = true)]
    pub haproxy_api_pass: String,

    /// Timeout for every Data Plane API request, in seconds.
    #[arg(long, env = "HAPROXY_API_TIMEOUT_SECS", default_value_t = DEFAULT_API_TIMEOUT_SECS)]
    pub haproxy_api_timeout_secs: u64,

    /// Ask HAProxy to reload on every commit.
    #[arg(long, env = "HAPROXY_FORCE_RELOAD")]
    pub force_reload: bool,

    /// Comma-separated namespaces to watch. Empty watches all namespaces.
    #[arg(long, env = "WATCH_NAMESPACE", default_value = "")]
    pub watch_namespace: String,

    /// Only manage Backends carrying this `key=value` label.
    #[arg(long, env = "WATCH_LABEL")]
    pub watch_label: Option<String>,

    /// Address of the metrics and health server.
    #[arg(long, env = "METRICS_BIND_ADDRESS", default_value = DEFAULT_METRICS_BIND_ADDRESS)]
    pub metrics_bind_address: SocketAddr,
}

impl OperatorConfig {
    /// Check values clap cannot check on its own.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.haproxy_api_url).map_err(|source| ConfigError::InvalidUrl {
            url: self.haproxy_api_url.clone(),
            source,
        })?;

        if self.haproxy_api_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        if let Some(label) = &self.watch_label {
            let valid = label
                .split_once('=')
                .is_some_and(|(key, value)| !key.trim().is_empty() && !value.trim().is_empty());
            if !valid {
                return Err(ConfigError::InvalidWatchLabel(label.clone()));
            }
        }

        Ok(())
    }

    /// Namespaces listed in `watch_namespace`, trimmed and without empties.
    #[must_use]
    pub fn namespaces(&self) -> Vec<String> {
        self.watch_namespace
            .split(',')
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .map(str::to_string)
            .collect()
    }

    #[must_use]
    pub fn watch_scope(&self) -> WatchScope {
        WatchScope {
            namespaces: self.namespaces(),
            label_selector: self.watch_label.clone(),
        }
    }

    #[must_use]
    pub fn haproxy_config(&self) -> HaproxyConfig {
        HaproxyConfig {
            timeout: Duration::from_secs(self.haproxy_api_timeout_secs),
            force_reload: self.force_reload,
            ..HaproxyConfig::new(
                self.haproxy_api_url.clone(),
                self.haproxy_api_user.clone(),
                self.haproxy_api_pass.clone(),
            )
        }
    }
}
