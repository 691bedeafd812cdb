//! Reservation lifecycle around a relay call.

use std::sync::Arc;

use chrono::Utc;
use tracing::{instrument, warn};

use super::store::UsageStore;
use super::{BudgetConfig, GateDecision};
use crate::telemetry;
use crate::types::{CallerId, Priority, ServiceLevel, Usage, UsageSnapshot};
use crate::{HeimdallrError, Result};

/// A reservation that passed the gate.
///
/// Consumed by value in [`BudgetTracker::commit`] and
/// [`BudgetTracker::rollback`], so a reservation cannot be finalized
/// twice.
#[derive(Debug)]
pub struct Reservation {
    caller: CallerId,
    /// Tokens provisionally reserved against the daily cap.
    pub tokens: u64,
    /// Service level at admission time.
    pub level: ServiceLevel,
}

/// Enforces per-user budgets with reserve-before-work semantics.
///
/// Tokens are reserved *before* the expensive relay call and settled to
/// actual usage after it, so a request that would overspend is rejected
/// up front rather than corrected retroactively. All store round trips
/// run under [`BudgetConfig::store_timeout`] and fail closed.
pub struct BudgetTracker {
    store: Arc<dyn UsageStore>,
    config: BudgetConfig,
}

impl BudgetTracker {
    /// Create a tracker over the given store.
    pub fn new(store: Arc<dyn UsageStore>, config: BudgetConfig) -> Self {
        Self { store, config }
    }

    /// The tracker's configuration.
    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    /// Estimate the token cost of relaying `message`.
    ///
    /// Rough prompt estimate (four characters per token) plus the
    /// configured reply reserve. Settled to actual usage at commit.
    pub fn estimate_tokens(&self, message: &str) -> u64 {
        let prompt = (message.chars().count() as u64).div_ceil(4).max(1);
        prompt + self.config.reply_reserve_tokens
    }

    /// Gate the request and reserve `estimated_tokens` for it.
    ///
    /// Returns the reservation on `Allow`; maps a gate rejection to
    /// [`HeimdallrError::BudgetExceeded`] and a store failure or timeout
    /// to [`HeimdallrError::StoreUnavailable`] (fail closed).
    #[instrument(skip(self), fields(caller = %caller))]
    pub async fn check_and_reserve(
        &self,
        caller: &CallerId,
        estimated_tokens: u64,
        priority: Priority,
    ) -> Result<Reservation> {
        let decision = self
            .store_call(self.store.reserve(
                caller,
                estimated_tokens,
                priority,
                &self.config.limits,
                Utc::now(),
            ))
            .await?;

        match decision {
            GateDecision::Allow { level } => Ok(Reservation {
                caller: caller.clone(),
                tokens: estimated_tokens,
                level,
            }),
            GateDecision::Reject { reason, level } => {
                metrics::counter!(telemetry::BUDGET_REJECTIONS_TOTAL,
                    "reason" => reason.as_str(),
                )
                .increment(1);
                Err(HeimdallrError::BudgetExceeded { level })
            }
        }
    }

    /// Settle a reservation to actual usage.
    ///
    /// Reserved-but-unused tokens are released; cost accrues at the
    /// configured per-token rate.
    pub async fn commit(&self, reservation: Reservation, usage: &Usage) -> Result<()> {
        let actual = u64::from(usage.total_tokens);
        let cost = actual as f64 * self.config.cost_per_token;
        self.store_call(self.store.commit(
            &reservation.caller,
            reservation.tokens,
            actual,
            cost,
            Utc::now(),
        ))
        .await
    }

    /// Release a reservation whose relay call failed.
    ///
    /// A rollback failure is logged and swallowed: the counters drift
    /// conservatively (reserved tokens linger until rollover) and the
    /// caller still sees the original relay error.
    pub async fn rollback(&self, reservation: Reservation) {
        if let Err(e) = self
            .store_call(self.store.rollback(&reservation.caller, reservation.tokens))
            .await
        {
            warn!(caller = %reservation.caller, error = %e, "budget rollback failed");
        }
    }

    /// Current usage snapshot for a caller.
    pub async fn snapshot(&self, caller: &CallerId) -> Result<UsageSnapshot> {
        let record = self
            .store_call(self.store.load(caller, Utc::now()))
            .await?;
        Ok(UsageSnapshot::from_record(&record, &self.config.limits))
    }

    /// Run one store round trip under the configured timeout, mapping a
    /// timeout to `StoreUnavailable`.
    async fn store_call<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.config.store_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(HeimdallrError::StoreUnavailable(format!(
                "timed out after {}s",
                self.config.store_timeout.as_secs()
            ))),
        }
    }
}
