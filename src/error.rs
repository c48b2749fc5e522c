//! Error types for event-notifier

use thiserror::Error;

/// Errors that can occur while synchronizing rules or delivering notifications
#[derive(Debug, Error)]
pub enum NotifierError {
    /// A rule carries a configuration the matcher cannot use (e.g. a bad pattern)
    #[error("Invalid configuration for rule '{rule}': {reason}")]
    Configuration { rule: String, reason: String },

    /// The remote channel rejected the rule's credential
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The remote channel does not know the rule's destination
    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    /// Network failure, timeout, rate limit or remote server error
    #[error("Transient delivery failure: {0}")]
    TransientDelivery(String),

    /// Attaching or releasing a finalizer marker failed
    #[error("Finalizer update failed for '{name}': {reason}")]
    Finalizer { name: String, reason: String },

    /// Invalid notifier configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NotifierError {
    /// Whether a later attempt may succeed without operator intervention
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientDelivery(_) | Self::Finalizer { .. })
    }
}

/// Result type alias for notifier operations
pub type Result<T> = std::result::Result<T, NotifierError>;
