//! Message formatter: renders a matched event into a chat payload
//!
//! The payload keeps the event message as its primary line and carries the
//! descriptive metadata as titled fields, mirroring a chat attachment.

use crate::types::{ClusterEvent, Rule};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Fixed, locale-independent timestamp format (UTC)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Rendered notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payload {
    /// Primary line: the event message in bold markup
    pub text: String,

    /// Descriptive fields, in display order
    pub fields: Vec<PayloadField>,

    /// Rule that produced this payload
    #[serde(skip)]
    pub rule: String,
}

/// One titled line of a payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayloadField {
    pub title: String,
    pub value: String,
}

impl PayloadField {
    fn new(title: &str, value: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            value: value.into(),
        }
    }
}

impl Payload {
    /// Plain-text rendering for channels without attachment support
    pub fn to_text(&self) -> String {
        let mut out = self.text.clone();
        for field in &self.fields {
            out.push('\n');
            out.push_str(&field.title);
            out.push_str(": ");
            out.push_str(&field.value);
        }
        out
    }

    /// Value of the field with the given title
    pub fn field(&self, title: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.title == title)
            .map(|f| f.value.as_str())
    }
}

/// Render `event` as matched by `rule`
pub fn format(event: &ClusterEvent, rule: &Rule) -> Payload {
    Payload {
        text: format!("*{}*", event.message),
        fields: vec![
            PayloadField::new("Object Kind", event.subject_kind.as_str()),
            PayloadField::new("Object Name", event.subject_name.as_str()),
            PayloadField::new("Namespace", event.subject_namespace.as_str()),
            PayloadField::new("Count", event.count.to_string()),
            PayloadField::new("Reason", event.reason.as_str()),
            PayloadField::new("First Timestamp", timestamp(event.first_observed_at)),
            PayloadField::new("Last Timestamp", timestamp(event.last_observed_at)),
        ],
        rule: rule.name.clone(),
    }
}

fn timestamp(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        Some(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
        None => "unknown".to_string(),
    }
}
