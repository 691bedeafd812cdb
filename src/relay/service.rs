//! ChatRelay - budget-gated relay between callers and a completion engine.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{instrument, warn};

use crate::budget::BudgetTracker;
use crate::cache::{CachedReply, ResponseCache};
use crate::engine::CompletionEngine;
use crate::history::HistoryStore;
use crate::telemetry;
use crate::traits::ChatService;
use crate::types::{
    BatchRequest, BatchResponse, CallerId, ChatReply, ChatRequest, HistoryEntry, Usage,
    UsageSnapshot,
};
use crate::{HeimdallrError, Result};

/// Relay-level configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Timeout for one completion-engine call. Default: 60 seconds.
    pub upstream_timeout: Duration,
    /// Hard bound on batch size. Default: [`MAX_BATCH_ITEMS`](super::MAX_BATCH_ITEMS).
    pub max_batch_items: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            upstream_timeout: Duration::from_secs(60),
            max_batch_items: super::MAX_BATCH_ITEMS,
        }
    }
}

/// Budget-gated chat relay.
///
/// One invocation flows caller → budget gate → response cache → engine →
/// cache store → caller. The gate runs first, so a cache hit releases
/// its reservation rather than skipping the gate; see
/// [`chat`](ChatService::chat).
pub struct ChatRelay {
    pub(super) engine: Arc<dyn CompletionEngine>,
    pub(super) budget: BudgetTracker,
    pub(super) cache: ResponseCache,
    pub(super) history: Arc<dyn HistoryStore>,
    pub(super) config: RelayConfig,
}

impl ChatRelay {
    pub(super) fn new(
        engine: Arc<dyn CompletionEngine>,
        budget: BudgetTracker,
        cache: ResponseCache,
        history: Arc<dyn HistoryStore>,
        config: RelayConfig,
    ) -> Self {
        Self {
            engine,
            budget,
            cache,
            history,
            config,
        }
    }

    /// The relay's budget tracker (for snapshots and tests).
    pub fn budget(&self) -> &BudgetTracker {
        &self.budget
    }

    /// The relay's response cache.
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Single-chat flow, authentication already checked.
    ///
    /// Called directly by batch items so that per-item work is not
    /// double-counted under the top-level request metrics.
    pub(super) async fn chat_inner(
        &self,
        caller: &CallerId,
        request: ChatRequest,
    ) -> Result<ChatReply> {
        let estimated = self.budget.estimate_tokens(&request.message);
        let reservation = self
            .budget
            .check_and_reserve(caller, estimated, request.priority)
            .await?;
        let level = reservation.level;

        // Gate passed; a cache hit spends nothing, so release the
        // reservation before returning the stored payload.
        if let Some(hit) = self
            .cache
            .lookup(caller, request.context.as_deref(), &request.message)
            .await
        {
            self.budget.rollback(reservation).await;
            return Ok(ChatReply {
                text: hit.text,
                cached: true,
                context: request.context,
                model: hit.model,
                usage: hit.usage,
                service_level: level,
                timestamp: Utc::now(),
            });
        }

        let completion = match self.call_engine(caller, &request).await {
            Ok(completion) => completion,
            Err(e) => {
                self.budget.rollback(reservation).await;
                return Err(e);
            }
        };

        self.cache
            .insert(
                caller,
                request.context.as_deref(),
                &request.message,
                CachedReply {
                    text: completion.text.clone(),
                    model: completion.model.clone(),
                    usage: Some(completion.usage),
                },
            )
            .await;

        if let Err(e) = self
            .history
            .append(
                caller,
                HistoryEntry {
                    message: request.message.clone(),
                    reply: completion.text.clone(),
                    context: request.context.clone(),
                    timestamp: Utc::now(),
                },
            )
            .await
        {
            warn!(caller = %caller, error = %e, "history append failed");
        }

        Self::record_token_usage(&completion.usage);

        // A commit failure leaves the reservation standing in the store,
        // which keeps the counters conservative; the reply is still
        // returned since the spend already happened.
        if let Err(e) = self.budget.commit(reservation, &completion.usage).await {
            warn!(caller = %caller, error = %e, "budget commit failed");
        }

        Ok(ChatReply {
            text: completion.text,
            cached: false,
            context: request.context,
            model: completion.model,
            usage: Some(completion.usage),
            service_level: level,
            timestamp: Utc::now(),
        })
    }

    /// Call the engine under the configured timeout.
    async fn call_engine(
        &self,
        caller: &CallerId,
        request: &ChatRequest,
    ) -> Result<crate::engine::Completion> {
        let call = self
            .engine
            .generate(&request.message, request.context.as_deref(), caller);
        match tokio::time::timeout(self.config.upstream_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(HeimdallrError::Timeout {
                seconds: self.config.upstream_timeout.as_secs(),
            }),
        }
    }

    fn authenticate<'a>(caller: Option<&'a CallerId>) -> Result<&'a CallerId> {
        caller.ok_or(HeimdallrError::AuthenticationRequired)
    }

    /// Record request outcome metrics (counter + histogram).
    fn record_request(operation: &'static str, start: Instant, ok: bool) {
        let status = if ok { "ok" } else { "error" };
        metrics::counter!(telemetry::REQUESTS_TOTAL,
            "operation" => operation,
            "status" => status,
        )
        .increment(1);
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS,
            "operation" => operation,
        )
        .record(start.elapsed().as_secs_f64());
    }

    /// Record committed token usage.
    fn record_token_usage(usage: &Usage) {
        metrics::counter!(telemetry::TOKENS_TOTAL, "direction" => "prompt")
            .increment(u64::from(usage.prompt_tokens));
        metrics::counter!(telemetry::TOKENS_TOTAL, "direction" => "completion")
            .increment(u64::from(usage.completion_tokens));
    }
}

#[async_trait]
impl ChatService for ChatRelay {
    #[instrument(skip(self, request), fields(operation = "chat"))]
    async fn chat(&self, caller: Option<&CallerId>, request: ChatRequest) -> Result<ChatReply> {
        let start = Instant::now();
        let result = match Self::authenticate(caller) {
            Ok(caller) => self.chat_inner(caller, request).await,
            Err(e) => Err(e),
        };
        Self::record_request("chat", start, result.is_ok());
        result
    }

    #[instrument(skip(self, batch), fields(operation = "batch", batch_size = batch.len()))]
    async fn dispatch_batch(
        &self,
        caller: Option<&CallerId>,
        batch: BatchRequest,
    ) -> Result<BatchResponse> {
        let start = Instant::now();
        let result = match Self::authenticate(caller) {
            Ok(caller) => self.dispatch_inner(caller, batch).await,
            Err(e) => Err(e),
        };
        Self::record_request("batch", start, result.is_ok());
        result
    }

    #[instrument(skip(self), fields(operation = "history"))]
    async fn history(
        &self,
        caller: Option<&CallerId>,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>> {
        let start = Instant::now();
        let result = match Self::authenticate(caller) {
            Ok(caller) => self.history.recent(caller, limit).await,
            Err(e) => Err(e),
        };
        Self::record_request("history", start, result.is_ok());
        result
    }

    #[instrument(skip(self), fields(operation = "usage"))]
    async fn usage(&self, caller: Option<&CallerId>) -> Result<UsageSnapshot> {
        let start = Instant::now();
        let result = match Self::authenticate(caller) {
            Ok(caller) => self.budget.snapshot(caller).await,
            Err(e) => Err(e),
        };
        Self::record_request("usage", start, result.is_ok());
        result
    }
}
