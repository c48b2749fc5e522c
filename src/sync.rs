//! Lifecycle synchronizer: glue between reconciliation flows and the core
//!
//! Rule objects move through `Absent → Active → Terminating → Absent`.
//! On deletion the rule leaves the registry before the finalizer marker is
//! released, so an object can never be finally deleted while its rule is
//! still live. Events are matched against one registry snapshot and every
//! match is dispatched independently.

use crate::config::NotifierConfig;
use crate::dispatch::slack::SlackClient;
use crate::dispatch::{ChannelClient, DispatchOutcome, Dispatcher};
use crate::error::Result;
use crate::finalizer::FinalizerGate;
use crate::format::format;
use crate::matcher::EventMatcher;
use crate::registry::RuleRegistry;
use crate::types::{ClusterEvent, Rule, RuleObject};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Lifecycle state of one rule configuration object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleState {
    /// Not known to the registry
    Absent,
    /// Registered and matching events
    Active,
    /// Removed from the registry, finalizer release pending
    Terminating,
}

/// What a rule-object reconciliation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The object no longer exists; nothing was changed
    NothingToDo,

    /// The rule was inserted or replaced
    Upserted {
        rule: String,
        /// Set when the rule's pattern does not compile
        invalid_pattern: Option<String>,
    },

    /// The rule was removed and the object may now be deleted
    Removed {
        rule: String,
        finalizer_released: bool,
    },
}

/// Dispatch result for one matched rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub rule: String,
    pub outcome: DispatchOutcome,
}

/// Drives the registry, matcher and dispatcher from notifications
pub struct LifecycleSynchronizer {
    registry: Arc<RuleRegistry>,
    matcher: Arc<EventMatcher>,
    dispatcher: Dispatcher,
    gate: Arc<dyn FinalizerGate>,
    config: NotifierConfig,

    /// name → state; names in `Absent` have no entry
    states: RwLock<HashMap<String, RuleState>>,
}

impl LifecycleSynchronizer {
    /// Create a synchronizer delivering through `client`
    pub fn new(
        config: NotifierConfig,
        client: Arc<dyn ChannelClient>,
        gate: Arc<dyn FinalizerGate>,
    ) -> Result<Self> {
        config.validate()?;
        let dispatcher = Dispatcher::new(client, config.delivery_timeout());

        Ok(Self {
            registry: Arc::new(RuleRegistry::new()),
            matcher: Arc::new(EventMatcher::new()),
            dispatcher,
            gate,
            config,
            states: RwLock::new(HashMap::new()),
        })
    }

    /// Create a synchronizer delivering to Slack at `config.slack_api_url`
    pub fn slack(config: NotifierConfig, gate: Arc<dyn FinalizerGate>) -> Result<Self> {
        let client = SlackClient::new(config.slack_api_url.clone())?;
        Self::new(config, Arc::new(client), gate)
    }

    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    pub fn matcher(&self) -> &Arc<EventMatcher> {
        &self.matcher
    }

    pub fn config(&self) -> &NotifierConfig {
        &self.config
    }

    /// Current lifecycle state of a rule object
    pub async fn state(&self, name: &str) -> RuleState {
        let states = self.states.read().await;
        states.get(name).copied().unwrap_or(RuleState::Absent)
    }

    /// Handle a rule-object notification
    ///
    /// `object` is `None` when the object could not be found; that is not
    /// an error. A returned error means the collaborator should deliver the
    /// notification again.
    pub async fn reconcile_rule_object(
        &self,
        name: &str,
        object: Option<RuleObject>,
    ) -> Result<SyncOutcome> {
        tracing::debug!(rule = %name, "Rule object reconciling");

        let Some(object) = object else {
            tracing::debug!(rule = %name, "Rule object not found, nothing to do");
            return Ok(SyncOutcome::NothingToDo);
        };

        if object.deletion_requested {
            self.teardown(&object).await
        } else {
            self.apply(&object).await
        }
    }

    /// Handle an event notification; `None` means the event is gone
    pub async fn reconcile_event(&self, event: Option<ClusterEvent>) -> Vec<DispatchReport> {
        match event {
            Some(event) => self.on_event(&event).await,
            None => {
                tracing::debug!("Event not found, nothing to do");
                Vec::new()
            }
        }
    }

    /// Match an event against the current rules and dispatch every match
    ///
    /// Reports are sorted by rule name. A failed dispatch never prevents
    /// the others.
    pub async fn on_event(&self, event: &ClusterEvent) -> Vec<DispatchReport> {
        let rules = self.registry.snapshot().await;
        let matched = self.matcher.matches(event, &rules);
        if matched.is_empty() {
            return Vec::new();
        }

        let subject = event.subject();
        tracing::info!(
            subject = %subject,
            reason = %event.reason,
            rules = ?matched.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            "Event matched, dispatching"
        );

        let mut reports: Vec<DispatchReport> = stream::iter(matched)
            .map(|rule| self.dispatch(event, rule))
            .buffer_unordered(self.config.max_concurrent_dispatches)
            .collect()
            .await;
        reports.sort_by(|a, b| a.rule.cmp(&b.rule));

        let failed = reports.iter().filter(|r| !r.outcome.is_delivered()).count();
        tracing::debug!(
            subject = %subject,
            dispatched = reports.len(),
            failed,
            "Event dispatch complete"
        );
        reports
    }

    async fn dispatch(&self, event: &ClusterEvent, rule: Rule) -> DispatchReport {
        let payload = format(event, &rule);
        let outcome = self.dispatcher.send(&payload, &rule.destination).await;
        DispatchReport {
            rule: rule.name,
            outcome,
        }
    }

    /// Absent/Active → Active
    async fn apply(&self, object: &RuleObject) -> Result<SyncOutcome> {
        let rule = Rule::from_object(object);
        let name = rule.name.clone();

        let invalid_pattern = match self.matcher.validate_pattern(&rule) {
            Ok(()) => None,
            Err(e) => Some(e.to_string()),
        };

        self.registry.upsert(rule).await;
        self.set_state(&name, RuleState::Active).await;

        let marker = &self.config.finalizer;
        if !object.has_finalizer(marker) {
            self.gate.attach(&name, marker).await?;
            tracing::info!(rule = %name, finalizer = %marker, "Finalizer attached");
        }
        self.log_rules().await;

        Ok(SyncOutcome::Upserted {
            rule: name,
            invalid_pattern,
        })
    }

    /// Active → Terminating → Absent
    async fn teardown(&self, object: &RuleObject) -> Result<SyncOutcome> {
        let name = object.name.as_str();
        let marker = &self.config.finalizer;

        self.set_state(name, RuleState::Terminating).await;
        self.registry.remove(name).await;
        self.matcher.forget(name);

        let finalizer_released = object.has_finalizer(marker);
        if finalizer_released {
            if let Err(e) = self.gate.release(name, marker).await {
                tracing::warn!(
                    rule = %name,
                    finalizer = %marker,
                    error = %e,
                    "Finalizer release failed, rule stays terminating"
                );
                return Err(e);
            }
            tracing::info!(rule = %name, finalizer = %marker, "Finalizer released");
        }

        self.states.write().await.remove(name);
        self.log_rules().await;

        Ok(SyncOutcome::Removed {
            rule: name.to_string(),
            finalizer_released,
        })
    }

    /// Drop cached patterns left behind by in-flight passes and log the
    /// current rule list
    async fn log_rules(&self) {
        let names = self.registry.names().await;
        self.matcher.retain(&names);
        tracing::debug!(rules = ?names, "Current rule list");
    }

    async fn set_state(&self, name: &str, state: RuleState) {
        let previous = {
            let mut states = self.states.write().await;
            states.insert(name.to_string(), state)
        };
        if previous != Some(state) {
            tracing::debug!(rule = %name, from = ?previous, to = ?state, "Rule state changed");
        }
    }
}
