// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Frontends, their binds and backend switching rules.
//!
//! These follow the same create/update/no-op pattern as backends. Frontends carry
//! the managed description; binds and rules are owned through their frontend.

use super::types::{opt_str, BackendSwitchingRule, Bind, Frontend};
use super::{Change, ConfigSession};
use crate::constants::MANAGED_DESCRIPTION;
use crate::errors::HaproxyError;
use reqwest::Method;
use tracing::{debug, info};

const RESOURCE_FRONTEND: &str = "frontend";

const SWITCHING_RULES: &str = "backend_switching_rules";

fn frontends_path() -> [&'static str; 1] {
    ["frontends"]
}

fn frontend_path(name: &str) -> [&str; 2] {
    ["frontends", name]
}

fn binds_path(frontend: &str) -> [&str; 3] {
    ["frontends", frontend, "binds"]
}

fn rules_path(frontend: &str) -> [&str; 3] {
    ["frontends", frontend, SWITCHING_RULES]
}

/// Compare name, mode, default backend and description.
#[must_use]
pub fn frontends_equal(a: &Frontend, b: &Frontend) -> bool {
    a.name == b.name
        && opt_str(&a.mode) == opt_str(&b.mode)
        && opt_str(&a.default_backend) == opt_str(&b.default_backend)
        && opt_str(&a.description) == opt_str(&b.description)
}

/// Binds are identified by address and port.
#[must_use]
pub fn binds_equal(a: &Bind, b: &Bind) -> bool {
    opt_str(&a.address) == opt_str(&b.address) && a.port == b.port
}

fn rules_equal(a: &BackendSwitchingRule, b: &BackendSwitchingRule) -> bool {
    a.name == b.name && opt_str(&a.cond_test) == opt_str(&b.cond_test)
}

impl ConfigSession {
    /// Fetch a frontend by name. `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error on any non-404 failure.
    pub async fn get_frontend(&self, name: &str) -> Result<Option<Frontend>, HaproxyError> {
        let url = self.scoped_url(&frontend_path(name)).await?;
        let response = self
            .client()
            .request(Method::GET, url, None::<&()>)
            .await?;
        if response.is_not_found() {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(self.client().api_error("get frontend", response));
        }
        self.client().decode("frontend", &response).map(Some)
    }

    /// Create or update a frontend, stamping the managed description.
    ///
    /// # Errors
    ///
    /// Returns [`HaproxyError::NotManaged`] if a foreign frontend with the same name
    /// exists, or any request error.
    pub async fn ensure_frontend(&mut self, mut frontend: Frontend) -> Result<Change, HaproxyError> {
        frontend.description = Some(MANAGED_DESCRIPTION.to_string());

        match self.get_frontend(&frontend.name).await? {
            None => {
                info!(frontend = %frontend.name, "Creating frontend");
                let url = self.scoped_url(&frontends_path()).await?;
                let response = self
                    .client()
                    .request(Method::POST, url, Some(&frontend))
                    .await?;
                self.expect_write(response, "create frontend")?;
                self.mark_dirty(RESOURCE_FRONTEND, "create");
                Ok(Change::Created)
            }
            Some(current) if opt_str(&current.description) != MANAGED_DESCRIPTION => {
                Err(self.client().fail(HaproxyError::NotManaged {
                    resource_type: RESOURCE_FRONTEND,
                    name: frontend.name,
                }))
            }
            Some(current) if !frontends_equal(&current, &frontend) => {
                info!(frontend = %frontend.name, "Updating frontend");
                let url = self.scoped_url(&frontend_path(&frontend.name)).await?;
                let response = self
                    .client()
                    .request(Method::PUT, url, Some(&frontend))
                    .await?;
                self.expect_write(response, "update frontend")?;
                self.mark_dirty(RESOURCE_FRONTEND, "update");
                Ok(Change::Updated)
            }
            Some(_) => {
                debug!(frontend = %frontend.name, "Frontend is already in desired state");
                Ok(Change::Unchanged)
            }
        }
    }

    /// List the binds of a frontend.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be decoded.
    pub async fn list_binds(&self, frontend: &str) -> Result<Vec<Bind>, HaproxyError> {
        let url = self.scoped_url(&binds_path(frontend)).await?;
        let response = self
            .client()
            .request(Method::GET, url, None::<&()>)
            .await?;
        if !response.is_success() {
            return Err(self.client().api_error("list binds", response));
        }
        self.client().decode("bind list", &response)
    }

    /// Create `bind` unless a bind with the same address and port exists.
    ///
    /// # Errors
    ///
    /// Returns any request error.
    pub async fn ensure_bind(&mut self, frontend: &str, bind: &Bind) -> Result<Change, HaproxyError> {
        let binds = self.list_binds(frontend).await?;
        if binds.iter().any(|existing| binds_equal(existing, bind)) {
            debug!(frontend = %frontend, address = %opt_str(&bind.address), "Bind already exists");
            return Ok(Change::Unchanged);
        }

        info!(frontend = %frontend, address = %opt_str(&bind.address), port = ?bind.port, "Creating bind");
        let url = self.scoped_url(&binds_path(frontend)).await?;
        let response = self
            .client()
            .request(Method::POST, url, Some(bind))
            .await?;
        self.expect_write(response, "create bind")?;
        self.mark_dirty("bind", "create");
        Ok(Change::Created)
    }

    /// List the backend switching rules of a frontend, in evaluation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be decoded.
    pub async fn list_backend_switching_rules(
        &self,
        frontend: &str,
    ) -> Result<Vec<BackendSwitchingRule>, HaproxyError> {
        let url = self.scoped_url(&rules_path(frontend)).await?;
        let response = self
            .client()
            .request(Method::GET, url, None::<&()>)
            .await?;
        if !response.is_success() {
            return Err(self.client().api_error("list backend switching rules", response));
        }
        self.client().decode("backend switching rule list", &response)
    }

    /// Append `rule` unless an equal rule (same backend and condition) exists.
    /// The whole list is replaced in one request.
    ///
    /// # Errors
    ///
    /// Returns any request error.
    pub async fn ensure_backend_switching_rule(
        &mut self,
        frontend: &str,
        rule: &BackendSwitchingRule,
    ) -> Result<Change, HaproxyError> {
        let mut rules = self.list_backend_switching_rules(frontend).await?;
        if rules.iter().any(|existing| rules_equal(existing, rule)) {
            debug!(frontend = %frontend, backend = %rule.name, "Backend switching rule already exists");
            return Ok(Change::Unchanged);
        }

        info!(frontend = %frontend, backend = %rule.name, "Adding backend switching rule");
        rules.push(rule.clone());
        let url = self.scoped_url(&rules_path(frontend)).await?;
        let response = self
            .client()
            .request(Method::PUT, url, Some(&rules))
            .await?;
        self.expect_write(response, "replace backend switching rules")?;
        self.mark_dirty("backend_switching_rule", "update");
        Ok(Change::Updated)
    }

    /// Delete the rule at `index`. 404 counts as already deleted.
    ///
    /// # Errors
    ///
    /// Returns any other request error.
    pub async fn delete_backend_switching_rule(
        &mut self,
        frontend: &str,
        index: usize,
    ) -> Result<Change, HaproxyError> {
        info!(frontend = %frontend, index = index, "Deleting backend switching rule");
        let index = index.to_string();
        let url = self
            .scoped_url(&["frontends", frontend, SWITCHING_RULES, index.as_str()])
            .await?;
        let response = self
            .client()
            .request(Method::DELETE, url, None::<&()>)
            .await?;
        self.expect_delete(
            response,
            "backend_switching_rule",
            "delete backend switching rule",
        )
    }
}
