//! Batch fan-out with per-item failure isolation.
//!
//! All items in one batch run concurrently; the dispatch is a join over
//! independent futures, so it returns only once every item has settled.
//! A failing item becomes [`BatchOutcome::Error`] in its slot — it never
//! aborts or delays its siblings. Completion order is unspecified, but
//! the returned results are positional: `results[i].index == i`.

use std::time::Instant;

use futures_util::future;

use super::service::ChatRelay;
use crate::telemetry;
use crate::types::{
    BatchItem, BatchOutcome, BatchRequest, BatchResponse, BatchResult, BatchSummary, CallerId,
};
use crate::{HeimdallrError, Result};

/// Hard upper bound on items per batch. An oversized batch is rejected
/// whole, before any item executes.
pub const MAX_BATCH_ITEMS: usize = 10;

/// History turns returned when a batch `History` item gives no limit.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

impl ChatRelay {
    pub(super) async fn dispatch_inner(
        &self,
        caller: &CallerId,
        batch: BatchRequest,
    ) -> Result<BatchResponse> {
        if batch.len() > self.config.max_batch_items {
            return Err(HeimdallrError::BatchTooLarge {
                submitted: batch.len(),
                max: self.config.max_batch_items,
            });
        }

        let items = batch
            .requests
            .into_iter()
            .enumerate()
            .map(|(index, item)| self.run_item(index, caller, item));

        // join_all polls every item concurrently and preserves input
        // order, so results land in their slots without sorting.
        let results = future::join_all(items).await;

        let successful = results.iter().filter(|r| r.success()).count();
        let summary = BatchSummary {
            total: results.len(),
            successful,
            failed: results.len() - successful,
        };

        Ok(BatchResponse { results, summary })
    }

    /// Execute one item, capturing any failure as its outcome.
    async fn run_item(&self, index: usize, caller: &CallerId, item: BatchItem) -> BatchResult {
        let start = Instant::now();
        let outcome = match item {
            BatchItem::Chat(request) => match self.chat_inner(caller, request).await {
                Ok(reply) => BatchOutcome::Chat(reply),
                Err(e) => BatchOutcome::Error {
                    message: e.to_string(),
                },
            },
            BatchItem::History { limit } => {
                let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
                match self.history.recent(caller, limit).await {
                    Ok(entries) => BatchOutcome::History { entries },
                    Err(e) => BatchOutcome::Error {
                        message: e.to_string(),
                    },
                }
            }
            BatchItem::Usage => match self.budget.snapshot(caller).await {
                Ok(snapshot) => BatchOutcome::Usage(snapshot),
                Err(e) => BatchOutcome::Error {
                    message: e.to_string(),
                },
            },
        };

        let status = if matches!(outcome, BatchOutcome::Error { .. }) {
            "error"
        } else {
            "ok"
        };
        metrics::counter!(telemetry::BATCH_ITEMS_TOTAL, "status" => status).increment(1);

        BatchResult {
            index,
            duration_ms: start.elapsed().as_millis() as u64,
            outcome,
        }
    }
}
