//! Per-user usage accounting and service levels.
//!
//! The service level is a pure function of utilization — recomputed on
//! every check, never stored. This rules out a whole class of stale-state
//! bugs: two evaluations against the same record always agree.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::request::Priority;

/// Budget ceilings for one user scope.
///
/// A cap of zero (or a non-positive ceiling) means unlimited for that
/// resource.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetLimits {
    /// Maximum tokens per UTC day.
    pub daily_token_cap: u64,
    /// Maximum accrued cost per UTC calendar month.
    pub monthly_cost_ceiling: f64,
}

impl Default for BudgetLimits {
    fn default() -> Self {
        Self {
            daily_token_cap: 100_000,
            monthly_cost_ceiling: 10.0,
        }
    }
}

/// Degradation level derived from budget utilization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceLevel {
    /// Utilization below 0.70: full service.
    #[default]
    Normal,
    /// Utilization in [0.70, 0.85): served, caller informed.
    Warning,
    /// Utilization in [0.85, 0.95): served at reduced allowance.
    Slowdown,
    /// Utilization in [0.95, 1.0): only critical requests proceed.
    Emergency,
    /// Utilization at or above 1.0: all requests rejected until rollover.
    Shutoff,
}

impl ServiceLevel {
    pub const WARNING_THRESHOLD: f64 = 0.70;
    pub const SLOWDOWN_THRESHOLD: f64 = 0.85;
    pub const EMERGENCY_THRESHOLD: f64 = 0.95;
    pub const SHUTOFF_THRESHOLD: f64 = 1.0;

    /// Derive the service level from a utilization ratio.
    ///
    /// Boundaries are left-inclusive: exactly 0.70 is `Warning`, exactly
    /// 1.0 is `Shutoff`.
    pub fn from_utilization(utilization: f64) -> Self {
        if utilization >= Self::SHUTOFF_THRESHOLD {
            ServiceLevel::Shutoff
        } else if utilization >= Self::EMERGENCY_THRESHOLD {
            ServiceLevel::Emergency
        } else if utilization >= Self::SLOWDOWN_THRESHOLD {
            ServiceLevel::Slowdown
        } else if utilization >= Self::WARNING_THRESHOLD {
            ServiceLevel::Warning
        } else {
            ServiceLevel::Normal
        }
    }

    /// Whether a request of the given priority is admitted at this level.
    pub fn admits(&self, priority: Priority) -> bool {
        match self {
            ServiceLevel::Shutoff => false,
            ServiceLevel::Emergency => priority == Priority::Critical,
            _ => true,
        }
    }

    /// Stable lowercase name, used as a metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceLevel::Normal => "normal",
            ServiceLevel::Warning => "warning",
            ServiceLevel::Slowdown => "slowdown",
            ServiceLevel::Emergency => "emergency",
            ServiceLevel::Shutoff => "shutoff",
        }
    }
}

/// Durable per-user usage counters.
///
/// `tokens_reserved` covers in-flight requests that have passed the gate
/// but not yet committed; the gate counts it against the cap so that two
/// concurrent requests cannot both squeeze through the same headroom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub tokens_used_today: u64,
    pub tokens_reserved: u64,
    pub cost_this_period: f64,
    /// UTC day the daily counters belong to.
    pub day: NaiveDate,
}

impl UsageRecord {
    /// Fresh record for a user's first interaction.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            tokens_used_today: 0,
            tokens_reserved: 0,
            cost_this_period: 0.0,
            day: now.date_naive(),
        }
    }

    /// Reset counters whose period has ended.
    ///
    /// Daily tokens reset at the UTC day boundary, accrued cost at the
    /// calendar-month boundary. Reserved tokens survive rollover — they
    /// belong to requests still in flight.
    pub fn roll_over(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if today == self.day {
            return;
        }
        if (today.year(), today.month()) != (self.day.year(), self.day.month()) {
            self.cost_this_period = 0.0;
        }
        self.tokens_used_today = 0;
        self.day = today;
    }

    /// Tokens counted against the daily cap: committed plus in-flight.
    pub fn tokens_outstanding(&self) -> u64 {
        self.tokens_used_today.saturating_add(self.tokens_reserved)
    }

    /// Utilization ratio against the given limits.
    ///
    /// Takes the worse of token and cost utilization, so approaching
    /// either ceiling degrades service. Unlimited resources (zero cap)
    /// contribute 0.0.
    pub fn utilization(&self, limits: &BudgetLimits) -> f64 {
        let token_util = if limits.daily_token_cap == 0 {
            0.0
        } else {
            self.tokens_outstanding() as f64 / limits.daily_token_cap as f64
        };
        let cost_util = if limits.monthly_cost_ceiling <= 0.0 {
            0.0
        } else {
            self.cost_this_period / limits.monthly_cost_ceiling
        };
        token_util.max(cost_util)
    }
}

/// Point-in-time view of a user's budget, for callers and the batch
/// `Usage` item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub tokens_used_today: u64,
    pub daily_token_cap: u64,
    pub cost_this_period: f64,
    pub monthly_cost_ceiling: f64,
    pub utilization: f64,
    pub level: ServiceLevel,
}

impl UsageSnapshot {
    /// Build a snapshot from a record and the limits it is measured against.
    pub fn from_record(record: &UsageRecord, limits: &BudgetLimits) -> Self {
        let utilization = record.utilization(limits);
        Self {
            tokens_used_today: record.tokens_used_today,
            daily_token_cap: limits.daily_token_cap,
            cost_this_period: record.cost_this_period,
            monthly_cost_ceiling: limits.monthly_cost_ceiling,
            utilization,
            level: ServiceLevel::from_utilization(utilization),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn level_thresholds_are_left_inclusive() {
        assert_eq!(ServiceLevel::from_utilization(0.0), ServiceLevel::Normal);
        assert_eq!(ServiceLevel::from_utilization(0.69), ServiceLevel::Normal);
        assert_eq!(ServiceLevel::from_utilization(0.70), ServiceLevel::Warning);
        assert_eq!(ServiceLevel::from_utilization(0.85), ServiceLevel::Slowdown);
        assert_eq!(
            ServiceLevel::from_utilization(0.95),
            ServiceLevel::Emergency
        );
        assert_eq!(ServiceLevel::from_utilization(1.0), ServiceLevel::Shutoff);
        assert_eq!(ServiceLevel::from_utilization(2.5), ServiceLevel::Shutoff);
    }

    #[test]
    fn level_is_deterministic_at_boundaries() {
        // Same input, repeated evaluation, no other state involved.
        for _ in 0..10 {
            assert_eq!(ServiceLevel::from_utilization(0.70), ServiceLevel::Warning);
        }
    }

    #[test]
    fn emergency_admits_only_critical() {
        assert!(!ServiceLevel::Emergency.admits(Priority::Normal));
        assert!(ServiceLevel::Emergency.admits(Priority::Critical));
        assert!(!ServiceLevel::Shutoff.admits(Priority::Critical));
        assert!(ServiceLevel::Slowdown.admits(Priority::Normal));
    }

    #[test]
    fn daily_rollover_resets_tokens_not_cost() {
        let d1 = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let d2 = Utc.with_ymd_and_hms(2026, 3, 11, 0, 1, 0).unwrap();

        let mut record = UsageRecord::new(d1);
        record.tokens_used_today = 500;
        record.cost_this_period = 1.25;

        record.roll_over(d2);
        assert_eq!(record.tokens_used_today, 0);
        assert_eq!(record.cost_this_period, 1.25);
        assert_eq!(record.day, d2.date_naive());
    }

    #[test]
    fn monthly_rollover_resets_cost() {
        let d1 = Utc.with_ymd_and_hms(2026, 3, 31, 23, 0, 0).unwrap();
        let d2 = Utc.with_ymd_and_hms(2026, 4, 1, 0, 1, 0).unwrap();

        let mut record = UsageRecord::new(d1);
        record.cost_this_period = 9.99;

        record.roll_over(d2);
        assert_eq!(record.cost_this_period, 0.0);
    }

    #[test]
    fn rollover_keeps_reserved_tokens() {
        let d1 = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let d2 = Utc.with_ymd_and_hms(2026, 3, 11, 0, 1, 0).unwrap();

        let mut record = UsageRecord::new(d1);
        record.tokens_reserved = 300;

        record.roll_over(d2);
        assert_eq!(record.tokens_reserved, 300);
    }

    #[test]
    fn utilization_takes_worse_of_tokens_and_cost() {
        let now = Utc::now();
        let limits = BudgetLimits {
            daily_token_cap: 1000,
            monthly_cost_ceiling: 10.0,
        };

        let mut record = UsageRecord::new(now);
        record.tokens_used_today = 100; // 0.10
        record.cost_this_period = 9.0; // 0.90
        assert!((record.utilization(&limits) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn utilization_counts_reserved_tokens() {
        let now = Utc::now();
        let limits = BudgetLimits {
            daily_token_cap: 1000,
            monthly_cost_ceiling: 0.0,
        };

        let mut record = UsageRecord::new(now);
        record.tokens_used_today = 400;
        record.tokens_reserved = 500;
        assert!((record.utilization(&limits) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn zero_caps_mean_unlimited() {
        let now = Utc::now();
        let limits = BudgetLimits {
            daily_token_cap: 0,
            monthly_cost_ceiling: 0.0,
        };

        let mut record = UsageRecord::new(now);
        record.tokens_used_today = u64::MAX / 2;
        record.cost_this_period = 1e12;
        assert_eq!(record.utilization(&limits), 0.0);
    }

    #[test]
    fn snapshot_reflects_record_and_limits() {
        let now = Utc::now();
        let limits = BudgetLimits {
            daily_token_cap: 2000,
            monthly_cost_ceiling: 10.0,
        };

        let mut record = UsageRecord::new(now);
        record.tokens_used_today = 1900;

        let snapshot = UsageSnapshot::from_record(&record, &limits);
        assert!((snapshot.utilization - 0.95).abs() < 1e-9);
        assert_eq!(snapshot.level, ServiceLevel::Emergency);
        assert_eq!(snapshot.daily_token_cap, 2000);
    }
}
