//! Reply and batch outcome types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::usage::{ServiceLevel, UsageSnapshot};

/// Token usage statistics for one completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    /// Build usage from prompt/completion counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Reply to a single chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    /// Assistant reply content.
    pub text: String,
    /// Whether the reply was served from the response cache.
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Model attribution, when the engine reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Service level at the time the request was admitted. `Warning` and
    /// `Slowdown` signal degraded-but-served; rejections never produce a
    /// reply at all.
    pub service_level: ServiceLevel,
    pub timestamp: DateTime<Utc>,
}

/// One conversation turn, as recorded after a successful (non-cached)
/// chat relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub message: String,
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of one batch item.
///
/// Failures are captured as [`BatchOutcome::Error`] rather than
/// propagated, so one item's failure never aborts its siblings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchOutcome {
    Chat(ChatReply),
    History { entries: Vec<HistoryEntry> },
    Usage(UsageSnapshot),
    Error { message: String },
}

/// Result of one batch item, reported positionally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// Position of the corresponding item in the input batch.
    pub index: usize,
    /// Wall-clock duration of this item's execution.
    pub duration_ms: u64,
    pub outcome: BatchOutcome,
}

impl BatchResult {
    /// Whether the item completed without error.
    pub fn success(&self) -> bool {
        !matches!(self.outcome, BatchOutcome::Error { .. })
    }
}

/// Aggregate counts, computed after every item has settled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

/// Response to a batch call.
///
/// `results.len()` always equals the input item count, and `results[i]`
/// carries `index == i` regardless of completion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub results: Vec<BatchResult>,
    pub summary: BatchSummary,
}
