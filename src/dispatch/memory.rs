//! In-memory channel client
//!
//! Records every delivered payload instead of calling a remote service.
//! Useful for tests and single-process dry runs. Failures can be injected
//! per channel to exercise the dispatcher's error paths.

use super::{ChannelClient, DeliveryReceipt, FailureCause};
use crate::error::{NotifierError, Result};
use crate::format::Payload;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// A payload accepted by the in-memory channel
#[derive(Debug, Clone)]
pub struct PostedMessage {
    pub channel_id: String,
    pub delivery_id: String,
    pub payload: Payload,
}

#[derive(Default)]
struct State {
    posted: Vec<PostedMessage>,
    failures: HashMap<String, FailureCause>,
    attempts: usize,
}

/// Recording `ChannelClient`; clones share the same state
#[derive(Clone, Default)]
pub struct MemoryChannel {
    state: Arc<RwLock<State>>,
    latency: Option<Duration>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every post by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every post to `channel_id` fail with `cause`
    pub async fn fail_channel(&self, channel_id: impl Into<String>, cause: FailureCause) {
        let mut state = self.state.write().await;
        state.failures.insert(channel_id.into(), cause);
    }

    /// Stop injecting failures for `channel_id`
    pub async fn heal_channel(&self, channel_id: &str) {
        let mut state = self.state.write().await;
        state.failures.remove(channel_id);
    }

    /// Messages delivered so far, oldest first
    pub async fn posted(&self) -> Vec<PostedMessage> {
        self.state.read().await.posted.clone()
    }

    /// Messages delivered to one channel, oldest first
    pub async fn posted_to(&self, channel_id: &str) -> Vec<PostedMessage> {
        let state = self.state.read().await;
        state
            .posted
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .cloned()
            .collect()
    }

    /// Number of delivered messages
    pub async fn count(&self) -> usize {
        self.state.read().await.posted.len()
    }

    /// Number of post calls, successful or not
    pub async fn attempts(&self) -> usize {
        self.state.read().await.attempts
    }
}

#[async_trait]
impl ChannelClient for MemoryChannel {
    async fn post(
        &self,
        channel_id: &str,
        _credential: &str,
        payload: &Payload,
    ) -> Result<DeliveryReceipt> {
        {
            let mut state = self.state.write().await;
            state.attempts += 1;
        }

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.write().await;
        if let Some(cause) = state.failures.get(channel_id) {
            return Err(match cause.clone() {
                FailureCause::Authentication(msg) => NotifierError::Authentication(msg),
                FailureCause::InvalidDestination(msg) => NotifierError::InvalidDestination(msg),
                FailureCause::Transient(msg) => NotifierError::TransientDelivery(msg),
            });
        }

        let delivery_id = uuid::Uuid::new_v4().to_string();
        state.posted.push(PostedMessage {
            channel_id: channel_id.to_string(),
            delivery_id: delivery_id.clone(),
            payload: payload.clone(),
        });

        Ok(DeliveryReceipt {
            channel_id: channel_id.to_string(),
            delivery_id,
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}
