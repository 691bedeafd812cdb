//! Usage store seam and the in-memory reference implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{GateDecision, evaluate_gate};
use crate::Result;
use crate::types::{BudgetLimits, CallerId, Priority, UsageRecord};

/// Durable per-user usage counters.
///
/// The core needs only two primitives from the backing store: an atomic
/// read-modify-write (for [`reserve`](Self::reserve) and
/// [`commit`](Self::commit)) and a plain read (for
/// [`load`](Self::load)). No query language or indexing is assumed.
///
/// # Atomicity contract
///
/// `reserve` must evaluate [`evaluate_gate`] and apply the reservation
/// increment as one atomic operation per user. Multiple process
/// instances may run concurrently, so a production implementation backs
/// this with the store's own transaction or atomic-increment primitive,
/// not in-process locking alone. [`MemoryUsageStore`] satisfies the
/// contract for a single process by holding its lock across both steps.
///
/// # Failure semantics
///
/// Errors from this trait reject the request (fail closed). Never return
/// `Ok` with a guessed record when the backing store is unreachable.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Atomically gate and reserve `estimated_tokens` for `caller`.
    ///
    /// Rolls the record over to `now` first. On `Allow`, the tokens are
    /// reserved before this returns; the caller must later `commit` or
    /// `rollback` the same amount.
    async fn reserve(
        &self,
        caller: &CallerId,
        estimated_tokens: u64,
        priority: Priority,
        limits: &BudgetLimits,
        now: DateTime<Utc>,
    ) -> Result<GateDecision>;

    /// Finalize a reservation with actual usage.
    ///
    /// Releases `reserved_tokens`, adds `actual_tokens` to the daily
    /// count and `cost` to the period accrual.
    async fn commit(
        &self,
        caller: &CallerId,
        reserved_tokens: u64,
        actual_tokens: u64,
        cost: f64,
        now: DateTime<Utc>,
    ) -> Result<()>;

    /// Release a reservation whose relay call failed.
    async fn rollback(&self, caller: &CallerId, reserved_tokens: u64) -> Result<()>;

    /// Read the caller's record, rolled over to `now`. Returns a fresh
    /// record for first-time callers.
    async fn load(&self, caller: &CallerId, now: DateTime<Utc>) -> Result<UsageRecord>;
}

/// In-memory usage store.
///
/// Reference implementation for embedded use and tests. A single
/// `tokio::sync::Mutex` over the record map makes gate evaluation and
/// the reservation increment atomic within the process; counters do not
/// survive restart and are not shared across instances.
#[derive(Default)]
pub struct MemoryUsageStore {
    records: Mutex<HashMap<CallerId, UsageRecord>>,
}

impl MemoryUsageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn reserve(
        &self,
        caller: &CallerId,
        estimated_tokens: u64,
        priority: Priority,
        limits: &BudgetLimits,
        now: DateTime<Utc>,
    ) -> Result<GateDecision> {
        let mut records = self.records.lock().await;
        let record = records
            .entry(caller.clone())
            .or_insert_with(|| UsageRecord::new(now));
        record.roll_over(now);

        let decision = evaluate_gate(record, limits, estimated_tokens, priority);
        if let GateDecision::Allow { .. } = decision {
            record.tokens_reserved = record.tokens_reserved.saturating_add(estimated_tokens);
        }
        Ok(decision)
    }

    async fn commit(
        &self,
        caller: &CallerId,
        reserved_tokens: u64,
        actual_tokens: u64,
        cost: f64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut records = self.records.lock().await;
        let record = records
            .entry(caller.clone())
            .or_insert_with(|| UsageRecord::new(now));
        record.roll_over(now);
        record.tokens_reserved = record.tokens_reserved.saturating_sub(reserved_tokens);
        record.tokens_used_today = record.tokens_used_today.saturating_add(actual_tokens);
        record.cost_this_period += cost;
        Ok(())
    }

    async fn rollback(&self, caller: &CallerId, reserved_tokens: u64) -> Result<()> {
        let mut records = self.records.lock().await;
        if let Some(record) = records.get_mut(caller) {
            record.tokens_reserved = record.tokens_reserved.saturating_sub(reserved_tokens);
        }
        Ok(())
    }

    async fn load(&self, caller: &CallerId, now: DateTime<Utc>) -> Result<UsageRecord> {
        let mut records = self.records.lock().await;
        let record = records
            .entry(caller.clone())
            .or_insert_with(|| UsageRecord::new(now));
        record.roll_over(now);
        Ok(record.clone())
    }
}
