//! Builder for configuring relay instances

use std::sync::Arc;
use std::time::Duration;

use super::service::{ChatRelay, RelayConfig};
use crate::budget::{BudgetConfig, BudgetTracker, MemoryUsageStore, UsageStore};
use crate::cache::{CacheConfig, ResponseCache};
use crate::engine::CompletionEngine;
use crate::history::{HistoryStore, MemoryHistoryStore};
use crate::{HeimdallrError, Result};

/// Main entry point for creating relay instances.
pub struct Heimdallr;

impl Heimdallr {
    /// Create a new builder for configuring the relay.
    pub fn builder() -> HeimdallrBuilder {
        HeimdallrBuilder::new()
    }
}

/// Builder for configuring relay instances.
///
/// A completion engine is required; usage and history stores default to
/// the in-memory implementations (suitable for a single instance —
/// plug in durable stores when running more than one).
pub struct HeimdallrBuilder {
    engine: Option<Arc<dyn CompletionEngine>>,
    usage_store: Option<Arc<dyn UsageStore>>,
    history_store: Option<Arc<dyn HistoryStore>>,
    budget: BudgetConfig,
    cache: CacheConfig,
    relay: RelayConfig,
}

impl HeimdallrBuilder {
    pub fn new() -> Self {
        Self {
            engine: None,
            usage_store: None,
            history_store: None,
            budget: BudgetConfig::default(),
            cache: CacheConfig::default(),
            relay: RelayConfig::default(),
        }
    }

    /// Set the completion engine (required).
    pub fn engine(mut self, engine: Arc<dyn CompletionEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Set the usage store backing budget counters.
    pub fn usage_store(mut self, store: Arc<dyn UsageStore>) -> Self {
        self.usage_store = Some(store);
        self
    }

    /// Set the conversation history store.
    pub fn history_store(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.history_store = Some(store);
        self
    }

    /// Set budget limits, pricing, and store timeout.
    pub fn budget(mut self, config: BudgetConfig) -> Self {
        self.budget = config;
        self
    }

    /// Set response cache capacity and TTL.
    pub fn response_cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    /// Set the completion-engine call timeout.
    pub fn upstream_timeout(mut self, timeout: Duration) -> Self {
        self.relay.upstream_timeout = timeout;
        self
    }

    /// Override the batch size bound.
    pub fn max_batch_items(mut self, max: usize) -> Self {
        self.relay.max_batch_items = max;
        self
    }

    /// Build the relay.
    ///
    /// Fails with [`HeimdallrError::NoEngine`] when no completion engine
    /// was configured.
    pub fn build(self) -> Result<ChatRelay> {
        let engine = self.engine.ok_or(HeimdallrError::NoEngine)?;
        let usage_store = self
            .usage_store
            .unwrap_or_else(|| Arc::new(MemoryUsageStore::new()));
        let history_store = self
            .history_store
            .unwrap_or_else(|| Arc::new(MemoryHistoryStore::new()));

        Ok(ChatRelay::new(
            engine,
            BudgetTracker::new(usage_store, self.budget),
            ResponseCache::new(&self.cache),
            history_store,
            self.relay,
        ))
    }
}

impl Default for HeimdallrBuilder {
    fn default() -> Self {
        Self::new()
    }
}
