//! Finalizer gate: teardown guard on rule configuration objects
//!
//! The watch machinery owns the configuration objects; the synchronizer
//! only asks it to attach or release a marker. Both operations must be
//! idempotent: attaching a present marker or releasing an absent one
//! (or releasing on an object that is already gone) succeeds.

use crate::error::{NotifierError, Result};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Attaches and releases finalizer markers on configuration objects
#[async_trait]
pub trait FinalizerGate: Send + Sync {
    /// Ensure `marker` is present on object `name`
    async fn attach(&self, name: &str, marker: &str) -> Result<()>;

    /// Remove `marker` from object `name`, allowing final deletion
    async fn release(&self, name: &str, marker: &str) -> Result<()>;
}

/// Gate for hosts without finalizer support; every call succeeds
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFinalizerGate;

#[async_trait]
impl FinalizerGate for NoopFinalizerGate {
    async fn attach(&self, _name: &str, _marker: &str) -> Result<()> {
        Ok(())
    }

    async fn release(&self, _name: &str, _marker: &str) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct GateState {
    markers: HashMap<String, BTreeSet<String>>,
    failing: HashSet<String>,
    releases: usize,
}

/// In-memory gate for tests; clones share state
#[derive(Clone, Default)]
pub struct MemoryFinalizerGate {
    state: Arc<RwLock<GateState>>,
}

impl MemoryFinalizerGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether object `name` currently carries `marker`
    pub async fn has(&self, name: &str, marker: &str) -> bool {
        let state = self.state.read().await;
        state
            .markers
            .get(name)
            .map(|m| m.contains(marker))
            .unwrap_or(false)
    }

    /// Make attach/release on `name` fail until healed
    pub async fn fail(&self, name: impl Into<String>) {
        self.state.write().await.failing.insert(name.into());
    }

    pub async fn heal(&self, name: &str) {
        self.state.write().await.failing.remove(name);
    }

    /// Number of successful release calls
    pub async fn releases(&self) -> usize {
        self.state.read().await.releases
    }
}

#[async_trait]
impl FinalizerGate for MemoryFinalizerGate {
    async fn attach(&self, name: &str, marker: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.failing.contains(name) {
            return Err(NotifierError::Finalizer {
                name: name.to_string(),
                reason: "update rejected".to_string(),
            });
        }
        state
            .markers
            .entry(name.to_string())
            .or_default()
            .insert(marker.to_string());
        Ok(())
    }

    async fn release(&self, name: &str, marker: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.failing.contains(name) {
            return Err(NotifierError::Finalizer {
                name: name.to_string(),
                reason: "update rejected".to_string(),
            });
        }
        if let Some(markers) = state.markers.get_mut(name) {
            markers.remove(marker);
            if markers.is_empty() {
                state.markers.remove(name);
            }
        }
        state.releases += 1;
        Ok(())
    }
}
