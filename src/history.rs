//! Conversation history storage.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::Result;
use crate::types::{CallerId, HistoryEntry};

/// Default number of turns retained per caller by the in-memory store.
const DEFAULT_TURNS_PER_CALLER: usize = 100;

/// Per-caller conversation log.
///
/// The relay appends a turn after every successful non-cached chat;
/// cache hits are not re-recorded. `recent` returns newest-first.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append one turn to the caller's log.
    async fn append(&self, caller: &CallerId, entry: HistoryEntry) -> Result<()>;

    /// Fetch up to `limit` most recent turns, newest first.
    async fn recent(&self, caller: &CallerId, limit: usize) -> Result<Vec<HistoryEntry>>;
}

/// Bounded in-memory history store.
///
/// Keeps the most recent turns per caller; older turns are dropped once
/// the per-caller bound is reached. Lost on process restart.
pub struct MemoryHistoryStore {
    turns_per_caller: usize,
    logs: Mutex<HashMap<CallerId, VecDeque<HistoryEntry>>>,
}

impl MemoryHistoryStore {
    /// Create a store with the default per-caller bound (100 turns).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TURNS_PER_CALLER)
    }

    /// Create a store retaining up to `turns_per_caller` turns per caller.
    pub fn with_capacity(turns_per_caller: usize) -> Self {
        Self {
            turns_per_caller,
            logs: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, caller: &CallerId, entry: HistoryEntry) -> Result<()> {
        let mut logs = self.logs.lock().await;
        let log = logs.entry(caller.clone()).or_default();
        log.push_back(entry);
        while log.len() > self.turns_per_caller {
            log.pop_front();
        }
        Ok(())
    }

    async fn recent(&self, caller: &CallerId, limit: usize) -> Result<Vec<HistoryEntry>> {
        let logs = self.logs.lock().await;
        Ok(logs
            .get(caller)
            .map(|log| log.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(message: &str) -> HistoryEntry {
        HistoryEntry {
            message: message.to_string(),
            reply: format!("re: {message}"),
            context: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn recent_is_newest_first() {
        let store = MemoryHistoryStore::new();
        let caller = CallerId::new("u1");

        store.append(&caller, entry("first")).await.unwrap();
        store.append(&caller, entry("second")).await.unwrap();

        let recent = store.recent(&caller, 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "second");
        assert_eq!(recent[1].message, "first");
    }

    #[tokio::test]
    async fn per_caller_bound_drops_oldest() {
        let store = MemoryHistoryStore::with_capacity(2);
        let caller = CallerId::new("u1");

        for m in ["a", "b", "c"] {
            store.append(&caller, entry(m)).await.unwrap();
        }

        let recent = store.recent(&caller, 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "c");
        assert_eq!(recent[1].message, "b");
    }

    #[tokio::test]
    async fn unknown_caller_has_empty_history() {
        let store = MemoryHistoryStore::new();
        let recent = store.recent(&CallerId::new("nobody"), 5).await.unwrap();
        assert!(recent.is_empty());
    }

    #[tokio::test]
    async fn callers_are_isolated() {
        let store = MemoryHistoryStore::new();
        store.append(&CallerId::new("a"), entry("hi")).await.unwrap();

        let recent = store.recent(&CallerId::new("b"), 5).await.unwrap();
        assert!(recent.is_empty());
    }
}
