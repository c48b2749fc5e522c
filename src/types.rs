//! Core data types: rules, their configuration objects, and cluster events
//!
//! Wire-facing types use camelCase JSON serialization to match the
//! custom resource and core/v1 Event shapes the host process watches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Where a matched event is delivered
///
/// The credential never appears in `Debug` output or log records.
#[derive(Clone, PartialEq, Eq)]
pub struct Destination {
    /// Channel identifier understood by the remote chat service
    pub channel_id: String,

    /// Rule-scoped credential (e.g. a bot token)
    pub credential: String,
}

impl Destination {
    pub fn new(channel_id: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            credential: credential.into(),
        }
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("channel_id", &self.channel_id)
            .field("credential", &"<redacted>")
            .finish()
    }
}

/// A named forwarding policy
///
/// An event matches when its subject kind is in `resource_kinds` and
/// `message_pattern` finds a match in its message. An empty kind set
/// matches nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Unique identifier; also the configuration object's name
    pub name: String,

    /// Subject kinds this rule applies to (e.g. "Pod", "Deployment")
    pub resource_kinds: BTreeSet<String>,

    /// Regular expression evaluated against the event message
    pub message_pattern: String,

    /// Delivery target
    pub destination: Destination,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        resource_kinds: impl IntoIterator<Item = impl Into<String>>,
        message_pattern: impl Into<String>,
        destination: Destination,
    ) -> Self {
        Self {
            name: name.into(),
            resource_kinds: resource_kinds.into_iter().map(Into::into).collect(),
            message_pattern: message_pattern.into(),
            destination,
        }
    }

    /// Build an owned rule from a configuration object
    pub fn from_object(object: &RuleObject) -> Self {
        Self {
            name: object.name.clone(),
            resource_kinds: object.spec.resources.iter().cloned().collect(),
            message_pattern: object.spec.regex.clone(),
            destination: Destination::new(&object.spec.channel, &object.spec.token),
        }
    }

    /// Whether the rule applies to events about subjects of `kind`
    pub fn watches_kind(&self, kind: &str) -> bool {
        self.resource_kinds.contains(kind)
    }
}

/// Declarative spec of a notification configuration object
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSpec {
    /// Subject kinds to watch
    #[serde(default)]
    pub resources: Vec<String>,

    /// Message pattern
    #[serde(default)]
    pub regex: String,

    /// Destination channel
    pub channel: String,

    /// Channel credential
    pub token: String,
}

impl fmt::Debug for RuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSpec")
            .field("resources", &self.resources)
            .field("regex", &self.regex)
            .field("channel", &self.channel)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// A configuration-object notification as delivered by the watch machinery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleObject {
    /// Object name
    pub name: String,

    /// Declared rule
    pub spec: RuleSpec,

    /// The object carries a deletion timestamp
    #[serde(default)]
    pub deletion_requested: bool,

    /// Finalizer markers currently attached to the object
    #[serde(default)]
    pub finalizers: Vec<String>,
}

impl RuleObject {
    pub fn new(name: impl Into<String>, spec: RuleSpec) -> Self {
        Self {
            name: name.into(),
            spec,
            deletion_requested: false,
            finalizers: Vec::new(),
        }
    }

    /// Mark the object for deletion
    pub fn deleting(mut self) -> Self {
        self.deletion_requested = true;
        self
    }

    /// Attach a finalizer marker
    pub fn with_finalizer(mut self, marker: impl Into<String>) -> Self {
        let marker = marker.into();
        if !self.has_finalizer(&marker) {
            self.finalizers.push(marker);
        }
        self
    }

    pub fn has_finalizer(&self, marker: &str) -> bool {
        self.finalizers.iter().any(|f| f == marker)
    }
}

/// An observation about a cluster subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterEvent {
    /// Kind of the involved object (e.g. "Pod")
    pub subject_kind: String,

    /// Name of the involved object
    pub subject_name: String,

    /// Namespace of the involved object (empty for cluster-scoped subjects)
    #[serde(default)]
    pub subject_namespace: String,

    /// Free-text message
    pub message: String,

    /// Short machine-readable reason (e.g. "Unhealthy")
    #[serde(default)]
    pub reason: String,

    /// Number of times this event has occurred
    #[serde(default)]
    pub count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_observed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_observed_at: Option<DateTime<Utc>>,
}

impl ClusterEvent {
    /// Create an event observed once, now
    pub fn new(
        subject_kind: impl Into<String>,
        subject_name: impl Into<String>,
        subject_namespace: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            subject_kind: subject_kind.into(),
            subject_name: subject_name.into(),
            subject_namespace: subject_namespace.into(),
            message: message.into(),
            reason: String::new(),
            count: 1,
            first_observed_at: Some(now),
            last_observed_at: Some(now),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Set the first and last observation timestamps
    pub fn observed(mut self, first: DateTime<Utc>, last: DateTime<Utc>) -> Self {
        self.first_observed_at = Some(first);
        self.last_observed_at = Some(last);
        self
    }

    /// `Kind/namespace/name` of the involved object, for log records
    pub fn subject(&self) -> String {
        if self.subject_namespace.is_empty() {
            format!("{}/{}", self.subject_kind, self.subject_name)
        } else {
            format!(
                "{}/{}/{}",
                self.subject_kind, self.subject_namespace, self.subject_name
            )
        }
    }
}
