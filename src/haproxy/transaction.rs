// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Configuration transactions.
//!
//! A [`ConfigSession`] tracks at most one open transaction and a client-local
//! `dirty` flag. While a transaction is open every request is scoped with
//! `transaction_id=<id>`, otherwise with `version=<current version>`.
//!
//! ```text
//! Closed --open--> Open --write--> Open+Dirty
//!   ^                |                 |
//!   +----discard-----+                 |
//!   +----commit------------------------+
//! ```
//!
//! [`ConfigSession::close`] commits when dirty and discards otherwise, so a pass that
//! changed nothing never triggers a reload on HAProxy.

use super::types::Transaction;
use super::HaproxyClient;
use crate::constants::{
    DATAPLANE_CONFIGURATION_PATH, DATAPLANE_TRANSACTIONS_PATH, QUERY_FORCE_RELOAD,
    QUERY_TRANSACTION_ID, QUERY_VERSION,
};
use crate::errors::HaproxyError;
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

/// How a transaction was closed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Writes occurred and the transaction was applied.
    Committed(Transaction),
    /// Nothing was written and the empty transaction was deleted.
    Discarded,
}

/// Parse the body of `GET /configuration/version`.
///
/// Accepts both a bare integer (`42`) and a JSON object (`{"_version": 99}`).
///
/// # Errors
///
/// Returns [`HaproxyError::VersionParse`] for any other body.
///
/// # Example
///
/// ```rust
/// use haproxy_operator::haproxy::parse_config_version;
///
/// assert_eq!(parse_config_version("42").unwrap(), 42);
/// assert_eq!(parse_config_version(r#"{"_version":99}"#).unwrap(), 99);
/// assert!(parse_config_version("not-a-version").is_err());
/// ```
pub fn parse_config_version(body: &str) -> Result<i64, HaproxyError> {
    #[derive(Deserialize)]
    struct VersionBody {
        #[serde(rename = "_version")]
        version: i64,
    }

    let trimmed = body.trim();
    if let Ok(version) = trimmed.parse::<i64>() {
        return Ok(version);
    }

    serde_json::from_str::<VersionBody>(trimmed)
        .map(|v| v.version)
        .map_err(|_| HaproxyError::VersionParse {
            body: trimmed.to_string(),
        })
}

/// A sequence of Data Plane API calls sharing one (optional) transaction.
#[derive(Debug)]
pub struct ConfigSession {
    client: HaproxyClient,
    transaction: Option<Transaction>,
    dirty: bool,
}

impl ConfigSession {
    #[must_use]
    pub fn new(client: HaproxyClient) -> Self {
        Self {
            client,
            transaction: None,
            dirty: false,
        }
    }

    /// The underlying client.
    #[must_use]
    pub fn client(&self) -> &HaproxyClient {
        &self.client
    }

    /// The open transaction, if any.
    #[must_use]
    pub fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    /// Whether any create, update or delete succeeded since the transaction opened.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self, resource: &str, operation: &str) {
        self.dirty = true;
        self.client.metrics().remote_write(resource, operation);
    }

    /// Query parameter scoping the next request.
    pub(crate) async fn scope(&self) -> Result<(&'static str, String), HaproxyError> {
        if let Some(transaction) = &self.transaction {
            return Ok((QUERY_TRANSACTION_ID, transaction.id.clone()));
        }
        let version = self.client.get_config_version().await?;
        Ok((QUERY_VERSION, version.to_string()))
    }

    /// Configuration URL for `segments`, scoped to the open transaction or the
    /// current version. Each segment is percent-encoded.
    pub(crate) async fn scoped_url(&self, segments: &[&str]) -> Result<Url, HaproxyError> {
        let (key, value) = self.scope().await?;
        self.client.endpoint(
            DATAPLANE_CONFIGURATION_PATH,
            segments,
            &[(key, value.as_str())],
        )
    }

    /// Open a transaction stamped with the current configuration version.
    ///
    /// # Errors
    ///
    /// Returns [`HaproxyError::TransactionConflict`] on HTTP 409 (too many open
    /// transactions), [`HaproxyError::TransactionAlreadyOpen`] if this session already
    /// holds one, or any request error.
    pub async fn open(&mut self) -> Result<Transaction, HaproxyError> {
        if let Some(open) = &self.transaction {
            return Err(self.client.fail(HaproxyError::TransactionAlreadyOpen {
                id: open.id.clone(),
            }));
        }

        let version = self.client.get_config_version().await?;
        let url = self.client.endpoint(
            DATAPLANE_TRANSACTIONS_PATH,
            &[],
            &[(QUERY_VERSION, version.to_string().as_str())],
        )?;
        let response = self.client.request(Method::POST, url, None::<&()>).await?;

        if response.status == 409 {
            warn!(version = version, "Data Plane API refused a new transaction (409)");
            return Err(self.client.fail(HaproxyError::TransactionConflict));
        }
        if !response.is_success() {
            return Err(self.client.api_error("open transaction", response));
        }

        let transaction: Transaction = self.client.decode("transaction", &response)?;
        info!(
            transaction_id = %transaction.id,
            version = transaction.version,
            "Opened transaction"
        );
        self.transaction = Some(transaction.clone());
        self.dirty = false;
        Ok(transaction)
    }

    /// Commit the open transaction, reloading HAProxy if configured to.
    ///
    /// # Errors
    ///
    /// Returns [`HaproxyError::CommitRejected`] on 400, 404 or 406, and
    /// [`HaproxyError::ApiResponse`] on any other failure.
    pub async fn commit(&mut self) -> Result<Transaction, HaproxyError> {
        let Some(open) = self.transaction.clone() else {
            return Err(self.client.fail(HaproxyError::NoOpenTransaction));
        };

        let force_reload = if self.client.config().force_reload {
            "true"
        } else {
            "false"
        };
        let url = self.client.endpoint(
            DATAPLANE_TRANSACTIONS_PATH,
            &[open.id.as_str()],
            &[(QUERY_FORCE_RELOAD, force_reload)],
        )?;
        let response = self.client.request(Method::PUT, url, None::<&()>).await?;

        let rejected = |status: u16, reason: &'static str| HaproxyError::CommitRejected {
            id: open.id.clone(),
            status,
            reason,
        };

        if matches!(response.status, 400 | 404 | 406) {
            warn!(
                transaction_id = %open.id,
                status = response.status,
                body = %response.body,
                "Data Plane API rejected commit"
            );
        }

        match response.status {
            400 => Err(self.client.fail(rejected(400, "bad request"))),
            404 => {
                // Gone on the remote side, nothing left to discard.
                self.transaction = None;
                Err(self.client.fail(rejected(404, "transaction not found")))
            }
            406 => Err(self
                .client
                .fail(rejected(406, "configuration cannot be handled"))),
            _ if response.is_success() => {
                let committed =
                    serde_json::from_str::<Transaction>(&response.body).unwrap_or_else(|_| {
                        Transaction {
                            status: "success".to_string(),
                            ..open.clone()
                        }
                    });
                self.transaction = None;
                self.dirty = false;
                self.client.metrics().remote_write("transaction", "commit");
                info!(transaction_id = %open.id, status = %committed.status, "Committed transaction");
                Ok(committed)
            }
            _ => Err(self.client.api_error("commit transaction", response)),
        }
    }

    /// Delete the open transaction without applying it.
    ///
    /// The session forgets the transaction whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`HaproxyError::TransactionNotFound`] on 404 and
    /// [`HaproxyError::ApiResponse`] on any other failure.
    pub async fn discard(&mut self) -> Result<(), HaproxyError> {
        let Some(open) = self.transaction.take() else {
            return Err(self.client.fail(HaproxyError::NoOpenTransaction));
        };
        self.dirty = false;

        let url = self
            .client
            .endpoint(DATAPLANE_TRANSACTIONS_PATH, &[open.id.as_str()], &[])?;
        let response = self
            .client
            .request(Method::DELETE, url, None::<&()>)
            .await?;

        match response.status {
            404 => Err(self
                .client
                .fail(HaproxyError::TransactionNotFound { id: open.id })),
            _ if response.is_success() => {
                self.client.metrics().remote_write("transaction", "discard");
                debug!(transaction_id = %open.id, "Discarded transaction");
                Ok(())
            }
            _ => Err(self.client.api_error("discard transaction", response)),
        }
    }

    /// Commit if anything was written, otherwise discard.
    ///
    /// # Errors
    ///
    /// Returns the error of the underlying commit or discard, or
    /// [`HaproxyError::NoOpenTransaction`].
    pub async fn close(&mut self) -> Result<CloseOutcome, HaproxyError> {
        if self.transaction.is_none() {
            return Err(self.client.fail(HaproxyError::NoOpenTransaction));
        }
        if self.dirty {
            self.commit().await.map(CloseOutcome::Committed)
        } else {
            self.discard().await.map(|()| CloseOutcome::Discarded)
        }
    }

    /// Best-effort discard after a failure. Never fails.
    pub async fn abort(&mut self) {
        let Some(id) = self.transaction.as_ref().map(|t| t.id.clone()) else {
            return;
        };
        if let Err(e) = self.discard().await {
            warn!(transaction_id = %id, error = %e, "Failed to discard transaction after error");
        }
    }
}
