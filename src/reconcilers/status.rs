// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition and event helpers.
//!
//! Conditions follow the standard Kubernetes format:
//! - `type`: The aspect of the resource being reported
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the status last changed
//!
//! # Example
//!
//! ```rust,no_run
//! use haproxy_operator::reconcilers::status::create_condition;
//!
//! let condition = create_condition(
//!     "ReconcilingComplete",
//!     "True",
//!     "ReconcileCompleted",
//!     "Backend synchronized"
//! );
//! ```

use crate::crd::{Backend, BackendStatus, Condition};
use chrono::Utc;
use k8s_openapi::api::core::v1::{Event, ObjectReference};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use kube::api::PostParams;
use kube::{Api, Client, Resource, ResourceExt};
use tracing::{debug, warn};

/// Kubernetes event type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventType {
    Normal,
    Warning,
}

impl EventType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Warning => "Warning",
        }
    }
}

/// Create a new condition with the current timestamp.
///
/// # Example
///
/// ```rust
/// # use haproxy_operator::reconcilers::status::create_condition;
/// let condition = create_condition("Ready", "True", "AllGood", "All servers synced");
/// assert_eq!(condition.r#type, "Ready");
/// assert_eq!(condition.status, "True");
/// ```
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Check if a condition has changed compared to the existing one.
///
/// Type, status, reason and message are compared. `lastTransitionTime` is not.
#[must_use]
pub fn condition_changed(existing: Option<&Condition>, new_condition: &Condition) -> bool {
    existing.is_none_or(|current| {
        current.r#type != new_condition.r#type
            || current.status != new_condition.status
            || current.reason != new_condition.reason
            || current.message != new_condition.message
    })
}

/// Find a condition by type.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Update or add a condition in a conditions list (in-memory, no API call).
///
/// `lastTransitionTime` is preserved when the status does not change.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(create_condition(condition_type, status, reason, message));
    }
}

/// Compare two condition lists, ignoring `lastTransitionTime`.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    current.len() == new.len()
        && new.iter().all(|new_cond| {
            !condition_changed(find_condition(current, &new_cond.r#type), new_cond)
        })
}

/// Collects status changes for one `Backend` during a reconcile pass.
///
/// Nothing is written until the caller asks for [`BackendStatusUpdater::pending`],
/// which yields the new status only when it differs semantically from the stored
/// one. A pass that reaches the same outcome as the previous one therefore
/// produces no status write and no self-triggered reconcile.
#[derive(Debug)]
pub struct BackendStatusUpdater {
    current_status: Option<BackendStatus>,
    new_status: BackendStatus,
}

impl BackendStatusUpdater {
    #[must_use]
    pub fn new(backend: &Backend) -> Self {
        let current_status = backend.status.clone();
        let new_status = current_status.clone().unwrap_or_default();
        Self {
            current_status,
            new_status,
        }
    }

    /// Upsert a condition (in-memory only).
    pub fn set_condition(
        &mut self,
        condition_type: &str,
        status: &str,
        reason: &str,
        message: &str,
    ) {
        update_condition_in_memory(
            &mut self.new_status.conditions,
            condition_type,
            status,
            reason,
            message,
        );
    }

    pub fn set_observed_generation(&mut self, generation: Option<i64>) {
        self.new_status.observed_generation = generation;
    }

    /// Returns true if the new status differs from the stored one.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        match &self.current_status {
            None => true,
            Some(current) => {
                current.observed_generation != self.new_status.observed_generation
                    || !conditions_equal(&current.conditions, &self.new_status.conditions)
            }
        }
    }

    /// The status to write, if anything changed.
    #[must_use]
    pub fn pending(&self) -> Option<&BackendStatus> {
        self.has_changes().then_some(&self.new_status)
    }

    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.new_status.conditions
    }
}

/// Build an event for `resource`.
pub fn build_event<T>(resource: &T, event_type: EventType, reason: &str, message: &str) -> Event
where
    T: Resource<DynamicType = ()> + ResourceExt,
{
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    let now = Time(jiff::Timestamp::now());

    Event {
        metadata: ObjectMeta {
            generate_name: Some(format!("{name}-")),
            namespace: Some(namespace.clone()),
            ..Default::default()
        },
        involved_object: ObjectReference {
            api_version: Some(T::api_version(&()).to_string()),
            kind: Some(T::kind(&()).to_string()),
            name: Some(name),
            namespace: Some(namespace),
            uid: resource.meta().uid.clone(),
            ..Default::default()
        },
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        type_: Some(event_type.as_str().to_string()),
        first_timestamp: Some(now.clone()),
        last_timestamp: Some(now),
        count: Some(1),
        ..Default::default()
    }
}

/// Publish an event for `resource`. Failures are logged, never returned.
pub async fn create_event<T>(
    client: &Client,
    resource: &T,
    event_type: EventType,
    reason: &str,
    message: &str,
) where
    T: Resource<DynamicType = ()> + ResourceExt,
{
    let namespace = resource.namespace().unwrap_or_default();
    let event_api: Api<Event> = Api::namespaced(client.clone(), &namespace);
    let event = build_event(resource, event_type, reason, message);

    match event_api.create(&PostParams::default(), &event).await {
        Ok(_) => debug!(name = %resource.name_any(), reason = %reason, "Published event"),
        Err(e) => warn!(name = %resource.name_any(), error = %e, "Failed to create event"),
    }
}
