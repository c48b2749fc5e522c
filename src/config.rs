//! Notifier configuration

use crate::error::{NotifierError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Finalizer marker attached to every rule object
pub const DEFAULT_FINALIZER: &str = "finalizer.eventnotifier.drhelius.io";

/// Default Slack Web API base URL
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";

/// Runtime configuration for the synchronizer and dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifierConfig {
    /// Finalizer marker that gates rule-object deletion
    #[serde(default = "default_finalizer")]
    pub finalizer: String,

    /// Upper bound on a single remote delivery call, in seconds
    #[serde(default = "default_delivery_timeout_secs")]
    pub delivery_timeout_secs: u64,

    /// Maximum deliveries in flight for one event
    #[serde(default = "default_max_concurrent_dispatches")]
    pub max_concurrent_dispatches: usize,

    /// Slack Web API base URL
    #[serde(default = "default_slack_api_url")]
    pub slack_api_url: String,
}

fn default_finalizer() -> String {
    DEFAULT_FINALIZER.to_string()
}

fn default_delivery_timeout_secs() -> u64 {
    10
}

fn default_max_concurrent_dispatches() -> usize {
    8
}

fn default_slack_api_url() -> String {
    DEFAULT_SLACK_API_URL.to_string()
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            finalizer: default_finalizer(),
            delivery_timeout_secs: default_delivery_timeout_secs(),
            max_concurrent_dispatches: default_max_concurrent_dispatches(),
            slack_api_url: default_slack_api_url(),
        }
    }
}

impl NotifierConfig {
    /// Parse and validate a JSON configuration document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the notifier cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.finalizer.trim().is_empty() {
            return Err(NotifierError::Config(
                "Finalizer marker cannot be empty".to_string(),
            ));
        }
        if self.delivery_timeout_secs == 0 {
            return Err(NotifierError::Config(
                "Delivery timeout must be >= 1 second".to_string(),
            ));
        }
        if self.max_concurrent_dispatches == 0 {
            return Err(NotifierError::Config(
                "Max concurrent dispatches must be >= 1".to_string(),
            ));
        }
        if self.slack_api_url.trim().is_empty() {
            return Err(NotifierError::Config(
                "Slack API URL cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }

    pub fn with_finalizer(mut self, finalizer: impl Into<String>) -> Self {
        self.finalizer = finalizer.into();
        self
    }

    pub fn with_delivery_timeout_secs(mut self, secs: u64) -> Self {
        self.delivery_timeout_secs = secs;
        self
    }

    pub fn with_max_concurrent_dispatches(mut self, max: usize) -> Self {
        self.max_concurrent_dispatches = max;
        self
    }
}
