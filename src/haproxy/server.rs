// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Servers of a backend.
//!
//! Servers carry no description of their own; they are owned through their
//! backend, which [`ConfigSession::ensure_backend_definition`] has already checked.

use super::types::{opt_str, Server};
use super::{Change, ConfigSession, ServerSyncReport};
use crate::errors::HaproxyError;
use reqwest::Method;
use std::collections::HashSet;
use tracing::{debug, info};

const RESOURCE_SERVER: &str = "server";

fn servers_path(backend: &str) -> [&str; 3] {
    ["backends", backend, "servers"]
}

fn server_path<'a>(backend: &'a str, name: &'a str) -> [&'a str; 4] {
    ["backends", backend, "servers", name]
}

/// Compare name, address, port and check mode (case-insensitive).
#[must_use]
pub fn servers_equal(a: &Server, b: &Server) -> bool {
    a.name == b.name
        && a.address == b.address
        && a.port == b.port
        && opt_str(&a.check).eq_ignore_ascii_case(opt_str(&b.check))
}

impl ConfigSession {
    /// Fetch one server. `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error on any non-404 failure.
    pub async fn get_server(
        &self,
        backend: &str,
        name: &str,
    ) -> Result<Option<Server>, HaproxyError> {
        let url = self.scoped_url(&server_path(backend, name)).await?;
        let response = self
            .client()
            .request(Method::GET, url, None::<&()>)
            .await?;
        if response.is_not_found() {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(self.client().api_error("get server", response));
        }
        self.client().decode("server", &response).map(Some)
    }

    /// List all servers of a backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be decoded.
    pub async fn list_servers(&self, backend: &str) -> Result<Vec<Server>, HaproxyError> {
        let url = self.scoped_url(&servers_path(backend)).await?;
        let response = self
            .client()
            .request(Method::GET, url, None::<&()>)
            .await?;
        if !response.is_success() {
            return Err(self.client().api_error("list servers", response));
        }
        self.client().decode("server list", &response)
    }

    /// Create the server if absent, replace it if it differs, otherwise do nothing.
    ///
    /// # Errors
    ///
    /// Returns any request error.
    pub async fn ensure_server(
        &mut self,
        backend: &str,
        server: &Server,
    ) -> Result<Change, HaproxyError> {
        match self.get_server(backend, &server.name).await? {
            None => {
                info!(backend = %backend, server = %server.name, address = %server.address, "Creating server");
                let url = self.scoped_url(&servers_path(backend)).await?;
                let response = self
                    .client()
                    .request(Method::POST, url, Some(server))
                    .await?;
                self.expect_write(response, "create server")?;
                self.mark_dirty(RESOURCE_SERVER, "create");
                Ok(Change::Created)
            }
            Some(current) if !servers_equal(&current, server) => {
                info!(backend = %backend, server = %server.name, address = %server.address, "Updating server");
                let url = self.scoped_url(&server_path(backend, &server.name)).await?;
                let response = self
                    .client()
                    .request(Method::PUT, url, Some(server))
                    .await?;
                self.expect_write(response, "update server")?;
                self.mark_dirty(RESOURCE_SERVER, "update");
                Ok(Change::Updated)
            }
            Some(_) => {
                debug!(backend = %backend, server = %server.name, "Server already in desired state");
                Ok(Change::Unchanged)
            }
        }
    }

    /// Delete one server. 404 counts as already deleted.
    ///
    /// # Errors
    ///
    /// Returns any other request error.
    pub async fn delete_server(&mut self, backend: &str, name: &str) -> Result<Change, HaproxyError> {
        info!(backend = %backend, server = %name, "Deleting server");
        let url = self.scoped_url(&server_path(backend, name)).await?;
        let response = self
            .client()
            .request(Method::DELETE, url, None::<&()>)
            .await?;
        self.expect_delete(response, RESOURCE_SERVER, "delete server")
    }

    /// Upsert every desired server, then delete every remote server whose name is
    /// not desired. Afterwards the remote name set equals the desired name set.
    ///
    /// # Errors
    ///
    /// Returns the first request error; earlier writes stay in the transaction.
    pub async fn sync_servers(
        &mut self,
        backend: &str,
        desired: &[Server],
    ) -> Result<ServerSyncReport, HaproxyError> {
        let mut report = ServerSyncReport::default();

        for server in desired {
            match self.ensure_server(backend, server).await? {
                Change::Created => report.created.push(server.name.clone()),
                Change::Updated => report.updated.push(server.name.clone()),
                Change::Deleted | Change::Unchanged => {}
            }
        }

        let wanted: HashSet<&str> = desired.iter().map(|s| s.name.as_str()).collect();
        for remote in self.list_servers(backend).await? {
            if wanted.contains(remote.name.as_str()) {
                continue;
            }
            if self.delete_server(backend, &remote.name).await? == Change::Deleted {
                report.deleted.push(remote.name);
            }
        }

        Ok(report)
    }
}
