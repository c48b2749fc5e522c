//! Dispatcher: one delivery attempt per matched (event, rule) pair
//!
//! All chat backends (Slack, in-memory, ...) implement `ChannelClient`.
//! The `Dispatcher` wraps a client with a per-call timeout and turns the
//! result into a `DispatchOutcome`; it never retries.

use crate::error::{NotifierError, Result};
use crate::format::Payload;
use crate::types::Destination;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod memory;
pub mod slack;

/// Core trait for remote chat backends
///
/// `post` performs exactly one remote call. Implementations report
/// failures as `NotifierError::Authentication`,
/// `NotifierError::InvalidDestination` or `NotifierError::TransientDelivery`.
#[async_trait]
pub trait ChannelClient: Send + Sync {
    /// Deliver a payload to a channel using the given credential
    async fn post(
        &self,
        channel_id: &str,
        credential: &str,
        payload: &Payload,
    ) -> Result<DeliveryReceipt>;

    /// Client name (e.g., "slack", "memory")
    fn name(&self) -> &str;
}

/// Remote acknowledgement of a delivered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Channel as resolved by the remote service
    pub channel_id: String,

    /// Remote message identifier
    pub delivery_id: String,
}

/// Why a delivery attempt failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureCause {
    /// Credential rejected; needs operator action
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Channel unknown or unusable; needs operator action
    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    /// Network failure, timeout or remote overload; a later event may succeed
    #[error("transient transport failure: {0}")]
    Transient(String),
}

impl FailureCause {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<NotifierError> for FailureCause {
    fn from(err: NotifierError) -> Self {
        match err {
            NotifierError::Authentication(msg) => Self::Authentication(msg),
            NotifierError::InvalidDestination(msg) => Self::InvalidDestination(msg),
            NotifierError::Configuration { .. } | NotifierError::Config(_) => {
                Self::InvalidDestination(err.to_string())
            }
            other => Self::Transient(other.to_string()),
        }
    }
}

/// Result of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The remote accepted the message
    Delivered {
        channel_id: String,
        delivery_id: String,
        delivered_at: DateTime<Utc>,
    },
    /// The remote rejected the message or could not be reached
    Failed { cause: FailureCause },
}

impl DispatchOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    pub fn failure(&self) -> Option<&FailureCause> {
        match self {
            Self::Failed { cause } => Some(cause),
            Self::Delivered { .. } => None,
        }
    }
}

/// Sends payloads through a `ChannelClient`, one bounded attempt each
#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<dyn ChannelClient>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn ChannelClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Name of the underlying client
    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    /// Make one delivery attempt
    pub async fn send(&self, payload: &Payload, destination: &Destination) -> DispatchOutcome {
        let attempt = self.client.post(
            &destination.channel_id,
            &destination.credential,
            payload,
        );

        let result = match tokio::time::timeout(self.timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(NotifierError::TransientDelivery(format!(
                "delivery to '{}' timed out after {}s",
                destination.channel_id,
                self.timeout.as_secs_f64()
            ))),
        };

        match result {
            Ok(receipt) => {
                tracing::info!(
                    rule = %payload.rule,
                    channel = %receipt.channel_id,
                    delivery_id = %receipt.delivery_id,
                    client = self.client.name(),
                    "Message successfully sent to channel"
                );
                DispatchOutcome::Delivered {
                    channel_id: receipt.channel_id,
                    delivery_id: receipt.delivery_id,
                    delivered_at: Utc::now(),
                }
            }
            Err(e) => {
                let cause = FailureCause::from(e);
                if cause.is_transient() {
                    tracing::warn!(
                        rule = %payload.rule,
                        channel = %destination.channel_id,
                        cause = %cause,
                        "Delivery failed, will not retry"
                    );
                } else {
                    tracing::error!(
                        rule = %payload.rule,
                        channel = %destination.channel_id,
                        cause = %cause,
                        "Delivery rejected, rule configuration needs attention"
                    );
                }
                DispatchOutcome::Failed { cause }
            }
        }
    }
}
