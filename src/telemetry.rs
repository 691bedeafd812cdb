//! Telemetry metric name constants.
//!
//! Centralised metric names for heimdallr operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `heimdallr_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `operation` — relay operation ("chat", "batch", "history", "usage")
//! - `status` — outcome: "ok" or "error"
//! - `direction` — token direction: "prompt" or "completion"
//! - `reason` — budget rejection reason ("shutoff", "emergency", "cap")

/// Total requests handled by the relay.
///
/// Labels: `operation`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "heimdallr_requests_total";

/// Request duration in seconds.
///
/// Labels: `operation`.
pub const REQUEST_DURATION_SECONDS: &str = "heimdallr_request_duration_seconds";

/// Total tokens committed against user budgets.
///
/// Labels: `direction` ("prompt" | "completion").
pub const TOKENS_TOTAL: &str = "heimdallr_tokens_total";

/// Total response cache hits.
pub const CACHE_HITS_TOTAL: &str = "heimdallr_cache_hits_total";

/// Total response cache misses.
pub const CACHE_MISSES_TOTAL: &str = "heimdallr_cache_misses_total";

/// Total requests rejected by the budget gate.
///
/// Labels: `reason` ("shutoff" | "emergency" | "cap").
pub const BUDGET_REJECTIONS_TOTAL: &str = "heimdallr_budget_rejections_total";

/// Total batch items dispatched.
///
/// Labels: `status` ("ok" | "error").
pub const BATCH_ITEMS_TOTAL: &str = "heimdallr_batch_items_total";
