//! # event-notifier
//!
//! Rule-driven forwarding of cluster lifecycle events to chat channels.
//!
//! ## Overview
//!
//! Operators declare notification rules as configuration objects: which
//! subject kinds to watch, a pattern over the event message, and a chat
//! destination. `event-notifier` keeps an in-memory registry of those
//! rules in step with the objects' lifecycle and forwards every matching
//! event, best effort, to the rule's channel.
//!
//! ## Quick Start
//!
//! ```rust
//! use event_notifier::{
//!     ClusterEvent, LifecycleSynchronizer, MemoryChannel, NoopFinalizerGate,
//!     NotifierConfig, RuleObject, RuleSpec,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> event_notifier::Result<()> {
//! let channel = MemoryChannel::new();
//! let sync = LifecycleSynchronizer::new(
//!     NotifierConfig::default(),
//!     Arc::new(channel.clone()),
//!     Arc::new(NoopFinalizerGate),
//! )?;
//!
//! let spec = RuleSpec {
//!     resources: vec!["Pod".to_string()],
//!     regex: "timeout".to_string(),
//!     channel: "alerts".to_string(),
//!     token: "xoxb-...".to_string(),
//! };
//! sync.reconcile_rule_object("pod-timeouts", Some(RuleObject::new("pod-timeouts", spec)))
//!     .await?;
//!
//! let event = ClusterEvent::new("Pod", "web-0", "shop", "dial tcp 10.0.0.7:8080: i/o timeout");
//! let reports = sync.on_event(&event).await;
//! assert!(reports[0].outcome.is_delivered());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **RuleRegistry**: concurrent name → rule map with copy-on-read snapshots
//! - **EventMatcher**: kind + pattern predicate with a compiled-pattern cache
//! - **format**: renders a matched event into a chat payload
//! - **Dispatcher** / **ChannelClient**: one bounded delivery attempt per match
//! - **LifecycleSynchronizer**: finalizer-gated rule lifecycle and event fan-out

pub mod config;
pub mod dispatch;
pub mod error;
pub mod finalizer;
pub mod format;
pub mod matcher;
pub mod registry;
pub mod sync;
pub mod types;

// Re-export core types
pub use config::NotifierConfig;
pub use dispatch::{ChannelClient, DeliveryReceipt, DispatchOutcome, Dispatcher, FailureCause};
pub use error::{NotifierError, Result};
pub use finalizer::{FinalizerGate, MemoryFinalizerGate, NoopFinalizerGate};
pub use format::{Payload, PayloadField};
pub use matcher::EventMatcher;
pub use registry::RuleRegistry;
pub use sync::{DispatchReport, LifecycleSynchronizer, RuleState, SyncOutcome};
pub use types::{ClusterEvent, Destination, Rule, RuleObject, RuleSpec};

// Re-export channel clients for convenience
pub use dispatch::memory::{MemoryChannel, PostedMessage};
pub use dispatch::slack::SlackClient;
