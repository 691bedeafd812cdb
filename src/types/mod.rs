//! Public types for the Heimdallr API.

mod request;
mod response;
mod usage;

pub use request::{BatchItem, BatchRequest, CallerId, ChatRequest, Priority};
pub use response::{
    BatchOutcome, BatchResponse, BatchResult, BatchSummary, ChatReply, HistoryEntry, Usage,
};
pub use usage::{BudgetLimits, ServiceLevel, UsageRecord, UsageSnapshot};
