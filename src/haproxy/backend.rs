// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Backend operations and the full backend synchronization entry point.

use super::types::{opt_str, Backend};
use super::{ApiResponse, Change, ConfigSession, SyncReport};
use crate::constants::MANAGED_DESCRIPTION;
use crate::errors::HaproxyError;
use crate::model::ResolvedBackend;
use reqwest::Method;
use tracing::{debug, info};

const RESOURCE_BACKEND: &str = "backend";

fn backends_path() -> [&'static str; 1] {
    ["backends"]
}

fn backend_path(name: &str) -> [&str; 2] {
    ["backends", name]
}

/// Compare the fields this operator manages: name, balance algorithm, health-check
/// type, mode and description. Unset and empty values are equal.
#[must_use]
pub fn backends_equal(a: &Backend, b: &Backend) -> bool {
    let algorithm = |backend: &Backend| {
        backend
            .balance
            .as_ref()
            .and_then(|balance| balance.algorithm.clone())
            .unwrap_or_default()
    };

    a.name == b.name
        && algorithm(a) == algorithm(b)
        && opt_str(&a.adv_check) == opt_str(&b.adv_check)
        && opt_str(&a.mode) == opt_str(&b.mode)
        && opt_str(&a.description) == opt_str(&b.description)
}

fn is_managed(backend: &Backend) -> bool {
    opt_str(&backend.description) == MANAGED_DESCRIPTION
}

impl ConfigSession {
    /// Fetch a backend by name. `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error on any non-404 failure.
    pub async fn get_backend(&self, name: &str) -> Result<Option<Backend>, HaproxyError> {
        let url = self.scoped_url(&backend_path(name)).await?;
        let response = self
            .client()
            .request(Method::GET, url, None::<&()>)
            .await?;
        if response.is_not_found() {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(self.client().api_error("get backend", response));
        }
        self.client().decode("backend", &response).map(Some)
    }

    /// List the backends owned by this operator. Foreign backends are left out.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be decoded.
    pub async fn list_backends(&self) -> Result<Vec<Backend>, HaproxyError> {
        let url = self.scoped_url(&backends_path()).await?;
        let response = self
            .client()
            .request(Method::GET, url, None::<&()>)
            .await?;
        if !response.is_success() {
            return Err(self.client().api_error("list backends", response));
        }
        let all: Vec<Backend> = self.client().decode("backend list", &response)?;
        Ok(all.into_iter().filter(is_managed).collect())
    }

    /// Make the remote backend, its HTTP checks and its server set match `desired`.
    ///
    /// # Errors
    ///
    /// Returns [`HaproxyError::NotManaged`] without writing anything if a foreign
    /// backend with the same name exists, or the first request error.
    pub async fn ensure_backend(
        &mut self,
        desired: &ResolvedBackend,
    ) -> Result<SyncReport, HaproxyError> {
        let backend = self
            .ensure_backend_definition(desired.to_wire_backend())
            .await?;
        let http_checks = self
            .ensure_http_checks(&desired.name, &desired.wire_http_checks())
            .await?;
        let servers = self
            .sync_servers(&desired.name, &desired.wire_servers())
            .await?;

        Ok(SyncReport {
            backend,
            http_checks,
            servers,
        })
    }

    /// Create or update the backend section itself, stamping the managed description.
    ///
    /// # Errors
    ///
    /// Returns [`HaproxyError::NotManaged`] if a foreign backend with the same name
    /// exists, or any request error.
    pub async fn ensure_backend_definition(
        &mut self,
        mut backend: Backend,
    ) -> Result<Change, HaproxyError> {
        backend.description = Some(MANAGED_DESCRIPTION.to_string());

        let existing = self.get_backend(&backend.name).await?;
        match existing {
            None => {
                info!(backend = %backend.name, "Creating backend");
                let url = self.scoped_url(&backends_path()).await?;
                let response = self
                    .client()
                    .request(Method::POST, url, Some(&backend))
                    .await?;
                self.expect_write(response, "create backend")?;
                self.mark_dirty(RESOURCE_BACKEND, "create");
                Ok(Change::Created)
            }
            Some(current) if !is_managed(&current) => {
                debug!(
                    backend = %backend.name,
                    description = %opt_str(&current.description),
                    "Backend exists but is not managed by this operator"
                );
                Err(self.client().fail(HaproxyError::NotManaged {
                    resource_type: RESOURCE_BACKEND,
                    name: backend.name,
                }))
            }
            Some(current) if !backends_equal(&current, &backend) => {
                info!(backend = %backend.name, "Updating backend");
                let url = self.scoped_url(&backend_path(&backend.name)).await?;
                let response = self
                    .client()
                    .request(Method::PUT, url, Some(&backend))
                    .await?;
                self.expect_write(response, "update backend")?;
                self.mark_dirty(RESOURCE_BACKEND, "update");
                Ok(Change::Updated)
            }
            Some(_) => {
                debug!(backend = %backend.name, "Backend is already in desired state");
                Ok(Change::Unchanged)
            }
        }
    }

    /// Delete a managed backend.
    ///
    /// A backend that does not exist, or disappears before the delete lands, counts
    /// as already deleted and yields [`Change::Unchanged`].
    ///
    /// # Errors
    ///
    /// Returns [`HaproxyError::NotManaged`] for a foreign backend, or any request error.
    pub async fn delete_backend(&mut self, name: &str) -> Result<Change, HaproxyError> {
        let Some(current) = self.get_backend(name).await? else {
            info!(backend = %name, "Backend already absent from HAProxy");
            return Ok(Change::Unchanged);
        };
        if !is_managed(&current) {
            return Err(self.client().fail(HaproxyError::NotManaged {
                resource_type: RESOURCE_BACKEND,
                name: name.to_string(),
            }));
        }

        info!(backend = %name, "Deleting backend");
        let url = self.scoped_url(&backend_path(name)).await?;
        let response = self
            .client()
            .request(Method::DELETE, url, None::<&()>)
            .await?;
        self.expect_delete(response, RESOURCE_BACKEND, "delete backend")
    }

    /// Map a create or update response to `Ok(())` or an API error.
    pub(crate) fn expect_write(
        &self,
        response: ApiResponse,
        operation: &str,
    ) -> Result<(), HaproxyError> {
        if response.is_success() {
            Ok(())
        } else {
            Err(self.client().api_error(operation, response))
        }
    }

    /// Map a delete response: 404 means already gone, 200/202/204 mark the session dirty.
    pub(crate) fn expect_delete(
        &mut self,
        response: ApiResponse,
        resource: &str,
        operation: &str,
    ) -> Result<Change, HaproxyError> {
        match response.status {
            404 => Ok(Change::Unchanged),
            200 | 202 | 204 => {
                self.mark_dirty(resource, "delete");
                Ok(Change::Deleted)
            }
            _ if response.is_success() => Ok(Change::Unchanged),
            _ => Err(self.client().api_error(operation, response)),
        }
    }
}
