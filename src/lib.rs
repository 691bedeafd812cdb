//! Heimdallr - budget-gated chat relay
//!
//! This crate sits between an authenticated caller and an opaque
//! completion engine, adding the three things the engine itself does not
//! provide: per-user budget enforcement (reserve before work, settle
//! after), response caching for repeated questions, and compound
//! requests with per-item failure isolation.
//!
//! # Chat Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use heimdallr::{CallerId, ChatRequest, ChatService, Heimdallr, HttpCompletionEngine};
//!
//! #[tokio::main]
//! async fn main() -> heimdallr::Result<()> {
//!     let engine = HttpCompletionEngine::new("https://engine.example.com", "sk-your-key")?;
//!     let relay = Heimdallr::builder().engine(Arc::new(engine)).build()?;
//!
//!     let caller = CallerId::new("user-123");
//!     let reply = relay
//!         .chat(
//!             Some(&caller),
//!             ChatRequest::new("What is forgiveness?").context("general"),
//!         )
//!         .await?;
//!
//!     println!("{} (cached: {})", reply.text, reply.cached);
//!     Ok(())
//! }
//! ```
//!
//! # Batch Example
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use heimdallr::{CallerId, ChatRequest, ChatService, Heimdallr, HttpCompletionEngine};
//! use heimdallr::{BatchItem, BatchRequest};
//!
//! # #[tokio::main]
//! # async fn main() -> heimdallr::Result<()> {
//! # let engine = HttpCompletionEngine::new("https://engine.example.com", "sk-your-key")?;
//! # let relay = Heimdallr::builder().engine(Arc::new(engine)).build()?;
//! # let caller = CallerId::new("user-123");
//! let response = relay
//!     .dispatch_batch(
//!         Some(&caller),
//!         BatchRequest::new(vec![
//!             BatchItem::Chat(ChatRequest::new("Hello")),
//!             BatchItem::History { limit: Some(5) },
//!             BatchItem::Usage,
//!         ]),
//!     )
//!     .await?;
//!
//! assert_eq!(response.summary.total, 3);
//! # Ok(())
//! # }
//! ```

pub mod budget;
pub mod cache;
pub mod engine;
pub mod error;
pub mod history;
pub mod relay;
pub mod telemetry;
pub mod traits;
pub mod types;

// Re-export main types at crate root
pub use error::{HeimdallrError, Result};
pub use relay::{ChatRelay, Heimdallr, HeimdallrBuilder, RelayConfig};
pub use traits::ChatService;

pub use budget::{BudgetConfig, BudgetTracker, MemoryUsageStore, Reservation, UsageStore};
pub use cache::{CacheConfig, CachedReply, ResponseCache};
pub use engine::{Completion, CompletionEngine, HttpCompletionEngine};
pub use history::{HistoryStore, MemoryHistoryStore};

// Re-export all types
pub use types::{
    BatchItem, BatchOutcome, BatchRequest, BatchResponse, BatchResult, BatchSummary, BudgetLimits,
    CallerId, ChatReply, ChatRequest, HistoryEntry, Priority, ServiceLevel, Usage, UsageRecord,
    UsageSnapshot,
};
