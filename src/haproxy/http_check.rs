// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `http-check` steps of a backend.
//!
//! Checks run in order on HAProxy, so the list is compared position by position and
//! replaced as a whole when anything differs.

use super::types::{opt_str, HttpCheck};
use super::{Change, ConfigSession};
use crate::errors::HaproxyError;
use reqwest::Method;
use tracing::{debug, info};

fn http_checks_path(backend: &str) -> [&str; 3] {
    ["backends", backend, "http_checks"]
}

/// Element-wise comparison on type, method, uri and each header's name and format.
#[must_use]
pub fn http_checks_equal(a: &[HttpCheck], b: &[HttpCheck]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| http_check_equal(x, y))
}

fn http_check_equal(a: &HttpCheck, b: &HttpCheck) -> bool {
    a.check_type == b.check_type
        && opt_str(&a.method) == opt_str(&b.method)
        && opt_str(&a.uri) == opt_str(&b.uri)
        && a.headers.len() == b.headers.len()
        && a
            .headers
            .iter()
            .zip(&b.headers)
            .all(|(x, y)| x.name == y.name && x.fmt == y.fmt)
}

impl ConfigSession {
    /// Fetch the ordered check list of a backend. A missing list is empty.
    ///
    /// # Errors
    ///
    /// Returns an error on any non-404 failure.
    pub async fn get_http_checks(&self, backend: &str) -> Result<Vec<HttpCheck>, HaproxyError> {
        let url = self.scoped_url(&http_checks_path(backend)).await?;
        let response = self
            .client()
            .request(Method::GET, url, None::<&()>)
            .await?;
        if response.is_not_found() {
            return Ok(Vec::new());
        }
        if !response.is_success() {
            return Err(self.client().api_error("get http checks", response));
        }
        self.client().decode("http check list", &response)
    }

    /// Replace the check list of `backend` unless it already equals `desired`.
    ///
    /// # Errors
    ///
    /// Returns any request error.
    pub async fn ensure_http_checks(
        &mut self,
        backend: &str,
        desired: &[HttpCheck],
    ) -> Result<Change, HaproxyError> {
        let current = self.get_http_checks(backend).await?;
        if http_checks_equal(&current, desired) {
            debug!(backend = %backend, checks = desired.len(), "HTTP checks already in desired state");
            return Ok(Change::Unchanged);
        }

        info!(
            backend = %backend,
            current = current.len(),
            desired = desired.len(),
            "Replacing HTTP checks"
        );
        let url = self.scoped_url(&http_checks_path(backend)).await?;
        let response = self
            .client()
            .request(Method::PUT, url, Some(desired))
            .await?;
        self.expect_write(response, "replace http checks")?;
        self.mark_dirty("http_checks", "update");
        Ok(Change::Updated)
    }
}
