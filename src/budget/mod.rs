//! Budget gating: reserve before work, finalize after.
//!
//! Three pieces:
//!
//! - [`evaluate_gate`] — the pure admission policy. Given a (rolled-over)
//!   usage record, limits, an estimate, and a priority, decides allow or
//!   reject. No side effects, trivially testable.
//!
//! - [`UsageStore`](store::UsageStore) — the durable-counter seam. The
//!   one hard requirement on implementations is that they apply
//!   [`evaluate_gate`] *atomically* with the reservation increment, so
//!   two concurrent requests for the same user cannot both pass a check
//!   only one should pass.
//!
//! - [`BudgetTracker`](tracker::BudgetTracker) — the
//!   reserve/commit/rollback lifecycle around a relay call.
//!
//! # Failure semantics
//!
//! Budget enforcement fails closed. A store error or timeout surfaces as
//! [`StoreUnavailable`](crate::HeimdallrError::StoreUnavailable) and the
//! request is rejected — this is the one place in the relay where
//! fail-open is not acceptable, since it directly bounds cost exposure.

mod store;
mod tracker;

pub use store::{MemoryUsageStore, UsageStore};
pub use tracker::{BudgetTracker, Reservation};

use std::time::Duration;

use crate::types::{BudgetLimits, Priority, ServiceLevel, UsageRecord};

/// Budget tracker configuration.
#[derive(Debug, Clone)]
pub struct BudgetConfig {
    /// Per-user ceilings.
    pub limits: BudgetLimits,
    /// Cost attributed per token when committing actual usage.
    pub cost_per_token: f64,
    /// Tokens reserved for the reply on top of the prompt estimate.
    pub reply_reserve_tokens: u64,
    /// Timeout for one usage-store round trip.
    pub store_timeout: Duration,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            limits: BudgetLimits::default(),
            cost_per_token: 2e-6,
            reply_reserve_tokens: 256,
            store_timeout: Duration::from_secs(60),
        }
    }
}

impl BudgetConfig {
    /// Create a config with default limits and pricing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-user ceilings.
    pub fn limits(mut self, limits: BudgetLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the cost attributed per token.
    pub fn cost_per_token(mut self, cost: f64) -> Self {
        self.cost_per_token = cost;
        self
    }

    /// Set the reply-side token reserve.
    pub fn reply_reserve_tokens(mut self, tokens: u64) -> Self {
        self.reply_reserve_tokens = tokens;
        self
    }

    /// Set the usage-store round-trip timeout.
    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }
}

/// Why the gate rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Utilization at or past 1.0; nothing proceeds until rollover.
    Shutoff,
    /// Emergency level and the request was not critical.
    Emergency,
    /// The reservation itself would push tokens past the daily cap.
    CapExceeded,
}

impl RejectReason {
    /// Stable lowercase name, used as a metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Shutoff => "shutoff",
            RejectReason::Emergency => "emergency",
            RejectReason::CapExceeded => "cap",
        }
    }
}

/// Outcome of one gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow {
        level: ServiceLevel,
    },
    Reject {
        reason: RejectReason,
        level: ServiceLevel,
    },
}

/// Admission policy for one request.
///
/// The caller must have rolled the record over to `now` first. Evaluated
/// *before* the expensive relay call: a request that would exceed the
/// cap is rejected here, never allowed and corrected retroactively.
///
/// Store implementations call this inside their atomic section (see
/// module docs).
pub fn evaluate_gate(
    record: &UsageRecord,
    limits: &BudgetLimits,
    estimated_tokens: u64,
    priority: Priority,
) -> GateDecision {
    let level = ServiceLevel::from_utilization(record.utilization(limits));

    if !level.admits(priority) {
        let reason = match level {
            ServiceLevel::Shutoff => RejectReason::Shutoff,
            _ => RejectReason::Emergency,
        };
        return GateDecision::Reject { reason, level };
    }

    if limits.daily_token_cap > 0
        && record.tokens_outstanding().saturating_add(estimated_tokens) > limits.daily_token_cap
    {
        return GateDecision::Reject {
            reason: RejectReason::CapExceeded,
            level,
        };
    }

    GateDecision::Allow { level }
}
