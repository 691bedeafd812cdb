//! Core ChatService trait

use async_trait::async_trait;

use crate::Result;
use crate::types::{
    BatchRequest, BatchResponse, CallerId, ChatReply, ChatRequest, HistoryEntry, UsageSnapshot,
};

/// The relay's public surface.
///
/// Every operation takes the caller identity as `Option` and fails with
/// [`AuthenticationRequired`](crate::HeimdallrError::AuthenticationRequired)
/// when it is absent — authentication happens upstream of this crate,
/// the relay only enforces its presence.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Relay a single chat message: budget gate, cache lookup, engine
    /// call on a miss.
    async fn chat(&self, caller: Option<&CallerId>, request: ChatRequest) -> Result<ChatReply>;

    /// Execute a compound request: up to the batch bound of
    /// heterogeneous items, concurrently, with per-item failure
    /// isolation.
    async fn dispatch_batch(
        &self,
        caller: Option<&CallerId>,
        batch: BatchRequest,
    ) -> Result<BatchResponse>;

    /// Fetch the caller's recent conversation turns, newest first.
    async fn history(
        &self,
        caller: Option<&CallerId>,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>>;

    /// Fetch the caller's current budget snapshot.
    async fn usage(&self, caller: Option<&CallerId>) -> Result<UsageSnapshot>;
}
