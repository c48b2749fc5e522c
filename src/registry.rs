//! Rule registry: the live set of forwarding rules
//!
//! `RuleRegistry` is the single source of truth consulted by the matcher.
//! It is shared between reconciliation flows (`Arc<RuleRegistry>`) and
//! guarded by one lock; callers only ever see owned copies of rules.

use crate::types::Rule;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Concurrent mapping of rule name to rule
#[derive(Default)]
pub struct RuleRegistry {
    /// name → rule
    rules: RwLock<HashMap<String, Rule>>,
}

impl RuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a rule, or replace the whole entry if the name already exists
    pub async fn upsert(&self, rule: Rule) {
        let name = rule.name.clone();
        let kinds = rule.resource_kinds.clone();
        let pattern = rule.message_pattern.clone();
        let channel = rule.destination.channel_id.clone();

        let replaced = {
            let mut rules = self.rules.write().await;
            rules.insert(name.clone(), rule).is_some()
        };

        tracing::info!(
            rule = %name,
            kinds = ?kinds,
            pattern = %pattern,
            channel = %channel,
            replaced,
            "Rule upserted"
        );
    }

    /// Remove a rule by name; returns whether an entry existed
    ///
    /// Removing an unknown name is a no-op.
    pub async fn remove(&self, name: &str) -> bool {
        let removed = {
            let mut rules = self.rules.write().await;
            rules.remove(name).is_some()
        };

        if removed {
            tracing::info!(rule = %name, "Rule removed");
        } else {
            tracing::debug!(rule = %name, "Rule already absent");
        }
        removed
    }

    /// Point-in-time copy of every rule, sorted by name
    pub async fn snapshot(&self) -> Vec<Rule> {
        let rules = self.rules.read().await;
        let mut snapshot: Vec<Rule> = rules.values().cloned().collect();
        snapshot.sort_by(|a, b| a.name.cmp(&b.name));
        snapshot
    }

    /// Get a copy of a single rule
    pub async fn get(&self, name: &str) -> Option<Rule> {
        let rules = self.rules.read().await;
        rules.get(name).cloned()
    }

    /// Sorted rule names
    pub async fn names(&self) -> Vec<String> {
        let rules = self.rules.read().await;
        let mut names: Vec<String> = rules.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub async fn len(&self) -> usize {
        self.rules.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rules.read().await.is_empty()
    }
}
